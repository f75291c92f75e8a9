/// Built-in target engines and their generators.
pub mod naninovel;
pub mod renpy;
pub mod utage;

use crate::core::engine::EngineRegistry;
use crate::core::registry::GeneratorRegistry;
use crate::schema::command::Command;

/// Register every built-in engine's generators.
pub fn register_all(registry: &mut GeneratorRegistry) {
    registry.register_all(renpy::ENGINE, &renpy::entries());
    registry.register_all(naninovel::ENGINE, &naninovel::entries());
    registry.register_all(utage::ENGINE, &utage::entries());
}

/// Register every built-in engine's descriptor.
pub fn register_engines(registry: &mut EngineRegistry) {
    registry.register(renpy::descriptor());
    registry.register(naninovel::descriptor());
    registry.register(utage::descriptor());
}

/// Dialogue window handling requested by the `Window` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    Show,
    Hide,
    ShowAndHide,
}

impl WindowMode {
    /// Accepts both the spreadsheet's Chinese labels and English ones.
    pub fn parse(value: &str) -> Option<WindowMode> {
        match value {
            "显示" | "show" => Some(Self::Show),
            "隐藏" | "hide" => Some(Self::Hide),
            "显示和隐藏" | "both" => Some(Self::ShowAndHide),
            _ => None,
        }
    }

    pub fn shows(self) -> bool {
        matches!(self, Self::Show | Self::ShowAndHide)
    }

    pub fn hides(self) -> bool {
        matches!(self, Self::Hide | Self::ShowAndHide)
    }
}

/// True for values that ask a stage to hide its target.
pub(crate) fn is_hide_keyword(value: &str) -> bool {
    matches!(value, "hide" | "隐藏")
}

/// Wrap non-empty strings as line commands, keeping their order.
pub(crate) fn lines<I>(items: I) -> Vec<Command>
where
    I: IntoIterator<Item = String>,
{
    items
        .into_iter()
        .filter(|line| !line.is_empty())
        .map(Command::Line)
        .collect()
}

use std::fmt;

/// Which pre-trained person model the detector runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DetectorMode {
    /// Generic 64x128 person model.
    #[default]
    Default,
    /// Pedestrian model trained on the Daimler set (48x96 window).
    Daimler,
}

impl DetectorMode {
    pub fn name(self) -> &'static str {
        match self {
            DetectorMode::Default => "Default",
            DetectorMode::Daimler => "Daimler",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DetectorMode::Default => DetectorMode::Daimler,
            DetectorMode::Daimler => DetectorMode::Default,
        }
    }
}

impl fmt::Display for DetectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Two-state mode toggle. Starts in `Default`; `toggle` is the only transition.
#[derive(Clone, Debug, Default)]
pub struct ModeSelector {
    mode: DetectorMode,
}

impl ModeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DetectorMode {
        self.mode
    }

    /// Flip to the other mode and return it.
    pub fn toggle(&mut self) -> DetectorMode {
        self.mode = self.mode.toggled();
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_default() {
        assert_eq!(ModeSelector::new().mode(), DetectorMode::Default);
    }

    #[test]
    fn toggle_twice_is_identity() {
        let mut selector = ModeSelector::new();
        assert_eq!(selector.toggle(), DetectorMode::Daimler);
        assert_eq!(selector.toggle(), DetectorMode::Default);

        selector.toggle();
        selector.toggle();
        selector.toggle();
        assert_eq!(selector.mode(), DetectorMode::Daimler);
    }

    #[test]
    fn toggle_never_self_transitions() {
        for mode in [DetectorMode::Default, DetectorMode::Daimler] {
            assert_ne!(mode.toggled(), mode);
        }
    }
}

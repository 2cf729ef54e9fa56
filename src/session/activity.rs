use std::str::FromStr;

/// User interactions that count as activity for idle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityEvent {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl ActivityEvent {
    pub const ALL: [ActivityEvent; 6] = [
        Self::PointerDown,
        Self::PointerMove,
        Self::KeyPress,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
    ];

    /// The DOM event name the frontend reports.
    pub fn dom_name(self) -> &'static str {
        match self {
            Self::PointerDown => "mousedown",
            Self::PointerMove => "mousemove",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
        }
    }
}

impl FromStr for ActivityEvent {
    type Err = ();

    /// Accepts DOM event names; pointer events are folded into their mouse
    /// equivalents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mousedown" | "pointerdown" => Ok(Self::PointerDown),
            "mousemove" | "pointermove" => Ok(Self::PointerMove),
            "keypress" | "keydown" => Ok(Self::KeyPress),
            "scroll" => Ok(Self::Scroll),
            "touchstart" => Ok(Self::TouchStart),
            "click" => Ok(Self::Click),
            _ => Err(()),
        }
    }
}

/// Whether the page is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_names_parse_back() {
        for event in ActivityEvent::ALL {
            assert_eq!(event.dom_name().parse::<ActivityEvent>(), Ok(event));
        }
    }

    #[test]
    fn test_pointer_aliases() {
        assert_eq!("pointerdown".parse(), Ok(ActivityEvent::PointerDown));
        assert!("resize".parse::<ActivityEvent>().is_err());
    }
}

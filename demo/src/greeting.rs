//! Seasonal greetings keyed by feature toggle id.

/// What the demo shows when a seasonal toggle is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greeting {
    /// Background colour as `#RRGGBB`.
    pub color: &'static str,
    pub text: &'static str,
}

const GREETINGS: [(&str, Greeting); 4] = [
    (
        "814b5dda-c77b-4929-9a40-b683c56adbc6",
        Greeting {
            color: "#FF0000",
            text: "Merry Christmas!",
        },
    ),
    (
        "d02723f6-0df7-4b94-83e3-f737a53eb146",
        Greeting {
            color: "#FF8C00",
            text: "Happy Halloween!",
        },
    ),
    (
        "87bc1713-1f11-44e9-a9c3-bf5333b42ae8",
        Greeting {
            color: "#ADD8E6",
            text: "Happy New Year!",
        },
    ),
    (
        "1b35a1e4-3af5-4422-9422-065d9797ae70",
        Greeting {
            color: "#FFB6C1",
            text: "Happy Valentine's Day!",
        },
    ),
];

pub fn greeting_for(feature_id: &str) -> Option<Greeting> {
    GREETINGS
        .iter()
        .find(|(id, _)| *id == feature_id)
        .map(|(_, greeting)| *greeting)
}

//! Categorical plant attributes.
//!
//! Every variant travels on the wire (and is stored) under its human label,
//! e.g. `"Bright, indirect"`. Parsing any other label fails.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a label does not name any variant of a choice set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub label: String,
}

impl fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is not a valid {}", self.label, self.kind)
    }
}

impl std::error::Error for UnknownChoice {}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(UnknownChoice {
                        kind: $kind,
                        label: other.to_string(),
                    }),
                }
            }
        }
    };
}

choice_enum! {
    /// Mature size of a plant.
    PlantSize, "size" {
        ExtraSmall => "Extra Small",
        Small => "Small",
        Medium => "Medium",
        Large => "Large",
        ExtraLarge => "Extra Large",
    }
}

choice_enum! {
    WaterNeeds, "water requirement" {
        VeryLow => "Very Low",
        Low => "Low",
        Moderate => "Moderate",
        High => "High",
        VeryHigh => "Very High",
    }
}

choice_enum! {
    LightNeeds, "light requirement" {
        Indirect => "Indirect light",
        LowToMedium => "Low to medium",
        BrightIndirect => "Bright, indirect",
        LowToBright => "Low to bright",
        BrightDirect => "Bright, direct",
        Filtered => "Filtered light",
        FullSun => "Full sun",
        FullShade => "Full shade",
        MediumIndirect => "Medium, indirect",
        BrightWithSomeSun => "Bright light with some direct sun",
    }
}

choice_enum! {
    /// How demanding the plant is to keep alive.
    CareLevel, "care level" {
        Easy => "Easy",
        Medium => "Medium",
        Difficult => "Difficult",
    }
}

choice_enum! {
    PlantCategory, "category" {
        AirPurifying => "Air-Purifying",
        Decorative => "Decorative",
        Flowering => "Flowering",
        Succulent => "Succulent",
        Cactus => "Cactus",
        Rare => "Rare",
        Edible => "Edible",
        Medicinal => "Medicinal",
        Climbing => "Climbing",
        OrnamentalGrass => "Ornamental Grass",
    }
}

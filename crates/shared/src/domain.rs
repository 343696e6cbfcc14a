use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ApiException, ErrorCode};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(OrderId);

/// Prefix the legacy order template puts in front of status values.
pub const LEGACY_STATUS_PREFIX: &str = "OrderStatus.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Removed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Removed,
    ];

    /// Bare enumeration value, as sent on the wire and used as selector option value.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Removed => "REMOVED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::Completed => "Completed",
            OrderStatus::Removed => "Removed",
        }
    }

    /// Raw status text as rendered by the server-side template, either bare
    /// (`IN_PROGRESS`) or namespaced (`OrderStatus.IN_PROGRESS`). Labels are
    /// not raw values.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let bare = raw.strip_prefix(LEGACY_STATUS_PREFIX).unwrap_or(raw);
        Self::ALL.into_iter().find(|status| status.as_str() == bare)
    }

    /// Accepts anything a status cell may show: a raw value or a display label.
    pub fn from_cell_text(text: &str) -> Option<Self> {
        Self::from_raw(text).or_else(|| {
            let text = text.trim();
            Self::ALL.into_iter().find(|status| status.label() == text)
        })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ApiException;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cell_text(s).ok_or_else(|| {
            ApiException::new(ErrorCode::Validation, format!("unknown order status '{s}'"))
        })
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! catalog_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Trims, uppercases and turns `-` into `_` before matching, the
            /// way the order backend cleans form input.
            pub fn parse_loose(input: &str) -> Option<Self> {
                let cleaned = input.trim().to_ascii_uppercase().replace('-', "_");
                Self::ALL.iter().copied().find(|value| value.as_str() == cleaned)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

catalog_enum!(DelicacyType {
    Sinukmani => "SINUKMANI",
    SapinSapin => "SAPIN_SAPIN",
    Puto => "PUTO",
    PutoAlsa => "PUTO_ALSA",
    Kutsinta => "KUTSINTA",
    PutoKutsinta => "PUTO_KUTSINTA",
    Maja => "MAJA",
    PichiPichi => "PICHI_PICHI",
    Palitaw => "PALITAW",
    Karioka => "KARIOKA",
    SumanMalagkit => "SUMAN_MALAGKIT",
    SumanCassava => "SUMAN_CASSAVA",
    SumanLihia => "SUMAN_LIHIA",
});

catalog_enum!(ContainerSize {
    Bilao10 => "BILAO_10",
    Bilao12 => "BILAO_12",
    Bilao14 => "BILAO_14",
    Bilao16 => "BILAO_16",
    Bilao18 => "BILAO_18",
    Tab => "TAB",
    Slice => "SLICE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    PickupDate,
    Delicacy,
    Status,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::PickupDate => "pickup_date",
            SortKey::Delicacy => "delicacy",
            SortKey::Status => "status",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ApiException;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pickup_date" => Ok(SortKey::PickupDate),
            "delicacy" => Ok(SortKey::Delicacy),
            "status" => Ok(SortKey::Status),
            other => Err(ApiException::new(
                ErrorCode::Validation,
                format!("invalid sort option '{other}'"),
            )),
        }
    }
}

//! Opaque identifiers handed out by the game authority.
//!
//! Every identifier is a UUID on the wire. Wrapping each one in its own type
//! keeps a `TileId` from ever being passed where a `PlayerId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse from the hyphenated string form
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// A player account
    PlayerId
);
uuid_id!(
    /// One game on the authority
    GameId
);
uuid_id!(
    /// One cell of a game board
    TileId
);
uuid_id!(
    /// A quiz category (Nature, History, ...)
    CategoryId
);
uuid_id!(
    /// A single contest (sub-game round) started on a tile
    ContestId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = PlayerId::parse("6f1c1f4e-3f0a-4a57-9d61-2d9a3f1b2c10").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"6f1c1f4e-3f0a-4a57-9d61-2d9a3f1b2c10\"");

        let back: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(GameId::parse("not-a-game").is_err());
    }
}

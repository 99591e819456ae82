use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First and last four characters, for labels where the full id is noise.
            pub fn short(&self) -> String {
                let chars: Vec<char> = self.0.chars().collect();
                if chars.len() <= 10 {
                    return self.0.clone();
                }
                let head: String = chars[..4].iter().collect();
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("{head}..{tail}")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// A marketplace account (buyer, seller, admin or delivery).
    UserId
);
string_id!(
    /// A product listing.
    ProductId
);
string_id!(
    /// A buyer/seller thread scoped to one product.
    ConversationId
);
string_id!(
    /// A single chat message.
    MessageId
);

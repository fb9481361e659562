/// Declares a fieldless enum persisted as text.
///
/// Generates `as_str`, `ALL`, `Display`, `FromStr` (case-insensitive),
/// `TryFrom<String>` (used by `#[sqlx(try_from = "String")]` row fields) and
/// serde impls that use the wire names.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident($kind:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::FarmError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::FarmError::invalid_enum($kind, s)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::FarmError;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

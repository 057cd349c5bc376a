//! Enumerations persisted under their display labels.
//!
//! Stored documents carry the Portuguese labels the dashboard shows
//! ("Em Progresso", "Concluída", ...). Parsing is lenient: case, accents,
//! spaces, dashes and underscores are ignored, and each variant may list
//! extra aliases (usually the English name) for CSV and CLI input.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

/// Fold a label to a comparison key: lowercase, accents stripped,
/// separators dropped.
pub fn fold_label(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '.'))
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $( $variant:ident => $label:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $( #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The label stored in documents and shown to users.
            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.pad(self.label())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::model::label::ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = $crate::model::label::fold_label(s);
                $(
                    if $crate::model::label::fold_label($label) == wanted
                        $( || $crate::model::label::fold_label($alias) == wanted )*
                    {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::model::label::ParseLabelError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

pub(crate) use labelled_enum;

//! Declarative macros for score type boilerplate.
//!
//! Every score type is a struct of `i64` levels; arithmetic, ordering,
//! scaling and slash-separated parsing are generated field by field.

/// Generates `Ord`, `PartialOrd`, `Add`, `Sub` and `Neg` for a level-based score.
///
/// Fields are listed highest priority first; ordering is lexicographic.
macro_rules! impl_score_ops {
    ($type:ident { $($field:ident),+ } => $ctor:ident) => {
        impl Ord for $type {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                std::cmp::Ordering::Equal
                    $(.then_with(|| self.$field.cmp(&other.$field)))+
            }
        }

        impl PartialOrd for $type {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl std::ops::Add for $type {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                $type::$ctor( $(self.$field + other.$field),+ )
            }
        }

        impl std::ops::Sub for $type {
            type Output = Self;

            fn sub(self, other: Self) -> Self {
                $type::$ctor( $(self.$field - other.$field),+ )
            }
        }

        impl std::ops::Neg for $type {
            type Output = Self;

            fn neg(self) -> Self {
                $type::$ctor( $(-self.$field),+ )
            }
        }
    };
}

/// Generates `scale` and `abs` inside an `impl Score for Type { ... }` block.
macro_rules! impl_score_scale {
    ($type:ident { $($field:ident),+ } => $ctor:ident) => {
        #[inline]
        fn scale(&self, factor: i64) -> Self {
            $type::$ctor( $( self.$field * factor ),+ )
        }

        fn abs(&self) -> Self {
            $type::$ctor( $( self.$field.abs() ),+ )
        }
    };
}

/// Generates `ParseableScore` for scores using the `"Xsuffix/Ysuffix"` format.
macro_rules! impl_score_parse {
    ($type:ident { $($field:ident => $suffix:literal),+ } => $ctor:ident) => {
        impl $crate::score::traits::ParseableScore for $type {
            fn parse(s: &str) -> Result<Self, $crate::score::traits::ScoreParseError> {
                let s = s.trim();
                let mut parts = s.split('/');
                $(
                    let $field = {
                        let part = parts.next().map(str::trim).ok_or_else(|| {
                            $crate::score::traits::ScoreParseError {
                                message: format!(
                                    "Invalid {} '{}': missing '{}' part",
                                    stringify!($type), s, $suffix
                                ),
                            }
                        })?;
                        let digits = part.strip_suffix($suffix).ok_or_else(|| {
                            $crate::score::traits::ScoreParseError {
                                message: format!("part '{}' must end with '{}'", part, $suffix),
                            }
                        })?;
                        digits.parse::<i64>().map_err(|e| {
                            $crate::score::traits::ScoreParseError {
                                message: format!("Invalid {} score '{}': {}", $suffix, digits, e),
                            }
                        })?
                    };
                )+
                if parts.next().is_some() {
                    return Err($crate::score::traits::ScoreParseError {
                        message: format!("Invalid {} '{}': too many parts", stringify!($type), s),
                    });
                }
                Ok($type::$ctor( $($field),+ ))
            }

            fn to_string_repr(&self) -> String {
                let parts: Vec<String> = vec![$(format!("{}{}", self.$field, $suffix)),+];
                parts.join("/")
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                use $crate::score::traits::ParseableScore;
                f.write_str(&self.to_string_repr())
            }
        }
    };
}

/*!
Strategy selectors.

The four behavioural switches of the model are chosen once per run. Each is a
plain enum with a canonical lowercase name, used on the command line, in
parameter files and in the result file.
*/
use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::error::ConfigError;

macro_rules! named_choice {
    ($name:ident, $parameter:expr, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ConfigError::UnknownChoice {
                        parameter: $parameter,
                        value: s.to_string(),
                        choices: Self::NAMES.join(", "),
                    }),
                }
            }
        }
    };
}

named_choice!(Mating, "mode", {
    Random => "random",
    Residency => "residency",
});

named_choice!(Placement, "oplacement", {
    Back => "back",
    Sort => "sort",
});

named_choice!(OffspringVote, "ovote", {
    Ignore => "ignore",
    Account => "account",
});

named_choice!(BreederVote, "bvote", {
    Ignore => "ignore",
    Kin => "kin",
    Despotic => "despotic",
    Egalitarian => "egalitarian",
    Hierarchical => "hierarchical",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in BreederVote::NAMES {
            assert_eq!(name.parse::<BreederVote>().unwrap().name(), *name);
        }
        assert_eq!("residency".parse::<Mating>(), Ok(Mating::Residency));
        assert_eq!(Placement::Sort.to_string(), "sort");
    }

    #[test]
    fn unknown_choice_names_the_parameter() {
        match "sorted".parse::<Placement>() {
            Err(ConfigError::UnknownChoice {
                parameter, choices, ..
            }) => {
                assert_eq!(parameter, "oplacement");
                assert_eq!(choices, "back, sort");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&OffspringVote::Account).unwrap(),
            "\"account\""
        );
        let v: BreederVote = serde_json::from_str("\"hierarchical\"").unwrap();
        assert_eq!(v, BreederVote::Hierarchical);
        assert!(serde_json::from_str::<Mating>("\"monogamous\"").is_err());
    }
}

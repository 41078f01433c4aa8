// Copyright 2024 Bare Metal Enrollment Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Various utilities.

use serde::{Deserialize, Deserializer};

/// Define an enumeration that maps onto protocol strings.
///
/// With `= Variant` unknown strings deserialize into that variant instead
/// of failing.
macro_rules! protocol_enum {
    (@def $(#[$attr:meta])* enum $name:ident {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+
    }) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$iattr])* $item),+
        }

        impl $name {
            /// String representation used on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$item => $val),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }
    };

    ($(#[$attr:meta])* enum $name:ident = $dflt:ident {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+ $(,)?
    }) => {
        protocol_enum! { @def $(#[$attr])* enum $name { $($(#[$iattr])* $item = $val),+ } }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<$name, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let value = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Ok(match value.as_str() {
                    $($val => $name::$item,)+
                    _ => $name::$dflt,
                })
            }
        }
    };

    ($(#[$attr:meta])* enum $name:ident {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+ $(,)?
    }) => {
        protocol_enum! { @def $(#[$attr])* enum $name { $($(#[$iattr])* $item = $val),+ } }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<$name, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let value = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                match value.as_str() {
                    $($val => Ok($name::$item),)+
                    other => Err(<D::Error as ::serde::de::Error>::unknown_variant(
                        other,
                        &[$($val),+],
                    )),
                }
            }
        }
    };
}

/// Deserialize `null` as the default value.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Last path component of an `@odata.id`.
pub fn odata_leaf(odata_id: &str) -> &str {
    odata_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(odata_id)
}

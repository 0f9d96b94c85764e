// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.
//!
//! - [`simple_display!`] — fixed label per enum variant, with `Display`
//! - [`setters!`] — chainable setter methods for config structs

/// Map each unit variant of an enum to a fixed label.
///
/// Generates an `as_str` accessor returning the label and a `Display` impl
/// delegating to it.
///
/// ```ignore
/// lattice_core::simple_display! {
///     MyEnum {
///         Foo => "foo",
///         Bar => "bar",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($name:ident { $( $variant:ident => $label:literal ),+ $(,)? }) => {
        impl $name {
            /// Fixed label for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Generate chainable setters inside an existing `impl` block, one
/// `;`-terminated entry per field.
///
/// An entry may be prefixed with a marker: `into` makes the setter accept
/// `impl Into<T>`; `option` does the same and stores `Some(value)` into an
/// `Option<T>` field. Unmarked entries take the field type directly.
///
/// ```ignore
/// impl MyConfig {
///     lattice_core::setters! {
///         into name: String;
///         count: u32;
///         option label: String;
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    () => {};

    (into $field:ident: $ty:ty; $($rest:tt)*) => {
        pub fn $field(mut self, value: impl Into<$ty>) -> Self {
            self.$field = value.into();
            self
        }
        $crate::setters! { $($rest)* }
    };

    (option $field:ident: $ty:ty; $($rest:tt)*) => {
        pub fn $field(mut self, value: impl Into<$ty>) -> Self {
            self.$field = Some(value.into());
            self
        }
        $crate::setters! { $($rest)* }
    };

    ($field:ident: $ty:ty; $($rest:tt)*) => {
        pub fn $field(mut self, value: $ty) -> Self {
            self.$field = value;
            self
        }
        $crate::setters! { $($rest)* }
    };
}

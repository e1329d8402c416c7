//! `define_port_error!`: port error enums with snake_case constructors.
//!
//! Struct-variant fields are accepted as `impl Into<T>`, so callers can pass
//! `&str` where the variant stores a `String`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Construct the `", stringify!($variant), "` variant.")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            #[doc = concat!("Construct the `", stringify!($variant), "` variant.")]
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( {
                    $(
                        #[doc = concat!("Reported `", stringify!($field), "`.")]
                        $field : $ty
                    ),*
                } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    define_port_error! {
        pub enum UploadError {
            Rejected { bucket: String } => "upload to {bucket} rejected",
            TooLarge { limit: u64 } => "payload exceeds {limit} bytes",
            Offline => "storage unreachable",
        }
    }

    #[rstest]
    fn string_fields_take_borrowed_input() {
        let error = UploadError::rejected("profile-images");
        assert_eq!(error.to_string(), "upload to profile-images rejected");
    }

    #[rstest]
    fn numeric_fields_keep_their_type() {
        assert_eq!(
            UploadError::too_large(5_u64),
            UploadError::TooLarge { limit: 5 }
        );
    }

    #[rstest]
    fn fieldless_variants_get_nullary_constructors() {
        assert_eq!(UploadError::offline().to_string(), "storage unreachable");
    }
}

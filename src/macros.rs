#[doc(hidden)]
#[macro_export]
macro_rules! builder {
    (
        $( #[ $( $meta:tt )* ] )*
        $vis:vis struct $name:ident {
            $(
                $( #[doc=$doc:expr] )*
                $field:ident : $type:ty = $default:expr,
            )*
        }
    ) => {
        $( #[ $( $meta )* ] )*
        $vis struct $name {
            $(
                $( #[doc=$doc] )*
                $field : $type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        impl $name {
            $(
                pub fn $field(mut self, value: $type) -> Self {
                    self.$field = value;
                    self
                }
            )*
        }
    }
}

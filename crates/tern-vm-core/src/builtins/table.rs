//! Member-table declaration macro.

/// Declare a `fn method(name) -> Option<&'static BuiltInMethod>` lookup.
///
/// ```ignore
/// method_table! {
///     pub fn method {
///         "push" => sync(0, VARIADIC, push),
///         "pop" => sync(0, 0, pop),
///     }
/// }
/// ```
macro_rules! method_table {
    ($vis:vis fn $fn_name:ident { $($name:literal => $flavor:ident($min:expr, $max:expr, $impl:expr)),* $(,)? }) => {
        $vis fn $fn_name(name: &str) -> Option<&'static $crate::builtins::BuiltInMethod> {
            match name {
                $(
                    $name => {
                        static METHOD: $crate::builtins::BuiltInMethod =
                            $crate::builtins::BuiltInMethod::$flavor($name, $min, $max, $impl);
                        Some(&METHOD)
                    }
                )*
                _ => None,
            }
        }
    };
}

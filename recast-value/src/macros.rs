/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// ```
/// use recast_value::value;
///
/// let v = value!({
///     "name": "Alice",
///     "tags": ["a", "b"],
///     "age": 30,
///     "manager": null
/// });
/// assert_eq!(v.get("age").and_then(|a| a.as_i64()), Some(30));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };
    (true) => {
        $crate::Value::Bool(true)
    };
    (false) => {
        $crate::Value::Bool(false)
    };
    ([]) => {
        $crate::Value::Array(::std::vec::Vec::new())
    };
    ([ $($elem:tt),+ $(,)? ]) => {
        $crate::Value::Array(::std::vec![ $( $crate::value!($elem) ),+ ])
    };
    ({}) => {
        $crate::Value::Object($crate::VObject::new())
    };
    ({ $($key:literal : $val:tt),+ $(,)? }) => {{
        let mut obj = $crate::VObject::new();
        $(
            obj.insert($key, $crate::value!($val));
        )+
        $crate::Value::Object(obj)
    }};
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

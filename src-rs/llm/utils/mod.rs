pub mod probe;
pub mod string_util;

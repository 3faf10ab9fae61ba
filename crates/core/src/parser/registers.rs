use super::numbers::{Integer, parse_integer};

pub const REGISTER_COUNT: i128 = 16;

pub fn parse_register(text: &str, context: &str) -> Result<u8, String> {
    let Some(index) = text.strip_prefix('r') else {
        return Err(format!(
            "Cannot parse register for {context}: Expected register (beginning with 'r'), \
             instead got '{text}'. Try something like 'r0' instead."
        ));
    };
    let Some(number) = parse_integer(index, false) else {
        return Err(format!(
            "Cannot parse register for {context}: Expected register with numeric index, \
             instead got '{text}'. Try something like 'r0' instead."
        ));
    };
    if index.contains('_') {
        return Err(format!(
            "Cannot parse register for {context}: Refusing underscores in register index \
             '{text}'. Try something like 'r0' instead."
        ));
    }
    match number {
        Integer::Value(value) if (0..REGISTER_COUNT).contains(&value) => Ok(value as u8),
        _ => Err(format!(
            "Cannot parse register for {context}: Expected register with index in 0,1,…,15, \
             instead got '{text}'. Try something like 'r0' instead."
        )),
    }
}

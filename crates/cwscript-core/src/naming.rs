//! Identifier spelling in generated code. Verification uses the same
//! conversions as the renderers so it can catch names that collide once converted.

/// `balanceOf` / `balance_of` → `balance_of`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// `balanceOf` → `BALANCE_OF`
pub fn screaming_snake_case(name: &str) -> String {
    snake_case(name).to_uppercase()
}

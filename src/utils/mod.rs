pub mod clock;
pub mod logging;

pub use clock::{elapsed_secs, Clock, ManualClock, SystemClock};

/// Renders an amount with comma thousands separators, e.g. `30000` -> `30,000`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

use crate::models::ClassificationStatus;

/// Format an amount as whole won with thousands separators: ₩1,234,000
pub fn won(val: f64) -> String {
    let negative = val < 0.0;
    let whole = format!("{}", val.abs().trunc() as u64);

    let mut with_commas = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && with_commas != "0" {
        format!("-\u{20a9}{with_commas}")
    } else {
        format!("\u{20a9}{with_commas}")
    }
}

pub fn status_label(status: ClassificationStatus) -> &'static str {
    match status {
        ClassificationStatus::Pending => "미분류",
        ClassificationStatus::Classified => "분류완료",
        ClassificationStatus::Manual => "수동분류",
    }
}

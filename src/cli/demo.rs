use std::path::Path;

use chrono::{Duration, Local};
use rusqlite::{params, Connection};

use crate::cli::open_db;
use crate::error::Result;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SAMPLE_TRANSACTIONS: i64 = 100;

// (code, name, type)
const INSTITUTIONS: &[(&str, &str, &str)] = &[
    ("001", "KB국민은행", "bank"),
    ("002", "신한은행", "bank"),
    ("003", "우리은행", "bank"),
    ("101", "삼성카드", "card"),
    ("102", "현대카드", "card"),
];

// (code, name, budget)
const DEPARTMENTS: &[(&str, &str, f64)] = &[
    ("001", "경영지원팀", 10_000_000.0),
    ("002", "개발팀", 15_000_000.0),
    ("003", "마케팅팀", 8_000_000.0),
    ("004", "영업팀", 12_000_000.0),
];

const CATEGORIES: &[(&str, &str)] = &[
    ("001", "사무용품"),
    ("002", "교통비"),
    ("003", "식비"),
    ("004", "임대료"),
    ("005", "통신비"),
    ("006", "광고비"),
    ("007", "회의비"),
];

// (name, business number, category id)
const VENDORS: &[(&str, &str, i64)] = &[
    ("사무용품쇼핑몰", "123-45-67890", 1),
    ("카카오T", "234-56-78901", 2),
    ("배달의민족", "345-67-89012", 3),
    ("부동산관리공사", "456-78-90123", 4),
    ("SKT", "567-89-01234", 5),
    ("스타벅스", "678-90-12345", 3),
    ("네이버", "789-01-23456", 6),
];

// (institution id, number, name, type, balance, department id)
const ACCOUNTS: &[(i64, &str, &str, &str, f64, i64)] = &[
    (1, "123-456-789012", "법인통장", "checking", 50_000_000.0, 1),
    (2, "987-654-321098", "개발팀 통장", "checking", 15_000_000.0, 2),
    (4, "1234-5678-9012", "법인카드", "credit", 0.0, 1),
];

// (title, message, type, severity)
const ALERTS: &[(&str, &str, &str, &str)] = &[
    ("예산 초과 경고", "개발팀의 이번 달 지출이 예산의 85%에 달했습니다.", "budget", "warning"),
    ("계약 만료 임박", "SKT 통신 서비스 계약이 30일 후 만료됩니다.", "contract", "info"),
    ("이상거래 감지", "평소보다 큰 금액의 거래가 감지되었습니다. (1,500,000원)", "anomaly", "warning"),
];

/// Sample transaction `i`: a coffee purchase every third day, a client fee
/// every fifth, office supplies otherwise. Every fourth one is left pending.
fn sample_row(i: i64) -> (f64, &'static str, &'static str, Option<i64>, Option<i64>) {
    if i % 3 == 0 {
        (-5500.0, "스타벅스 강남점", "스타벅스", Some(3), Some(6))
    } else if i % 5 == 0 {
        (15000.0, "프로젝트 수수료 입금", "클라이언트", None, None)
    } else {
        (-12000.0, "사무용품 구매", "오피스디포", Some(1), Some(1))
    }
}

fn load_sample_data(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    for (code, name, kind) in INSTITUTIONS {
        tx.execute(
            "INSERT INTO institutions (code, name, institution_type) VALUES (?1, ?2, ?3)",
            params![code, name, kind],
        )?;
    }
    for (code, name, budget) in DEPARTMENTS {
        tx.execute(
            "INSERT INTO departments (code, name, budget) VALUES (?1, ?2, ?3)",
            params![code, name, budget],
        )?;
    }
    for (code, name) in CATEGORIES {
        tx.execute("INSERT INTO categories (code, name) VALUES (?1, ?2)", params![code, name])?;
    }
    for (name, business_number, category_id) in VENDORS {
        tx.execute(
            "INSERT INTO vendors (name, business_number, category_id) VALUES (?1, ?2, ?3)",
            params![name, business_number, category_id],
        )?;
    }
    for (institution_id, number, name, kind, balance, department_id) in ACCOUNTS {
        tx.execute(
            "INSERT INTO accounts (institution_id, account_number, account_name, account_type, balance, department_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![institution_id, number, name, kind, balance, department_id],
        )?;
    }

    let now = Local::now();
    for i in 0..SAMPLE_TRANSACTIONS {
        let (amount, description, counterparty, category_id, vendor_id) = sample_row(i);
        let pending = i % 4 == 0;
        let (status, category_id, vendor_id, department_id) = if pending {
            ("pending", None, None, None)
        } else {
            ("classified", category_id, vendor_id, Some(if i % 2 == 0 { 2 } else { 1 }))
        };
        let date = (now - Duration::days(i)).format(DATETIME_FORMAT).to_string();
        tx.execute(
            "INSERT INTO transactions (account_id, transaction_id, amount, transaction_type, description, counterparty, \
             transaction_date, category_id, department_id, vendor_id, classification_status) \
             VALUES (1, ?1, ?2, 'debit', ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                format!("TXN-{i:06}"),
                amount,
                description,
                counterparty,
                date,
                category_id,
                department_id,
                vendor_id,
                status,
            ],
        )?;
    }

    for (title, message, kind, severity) in ALERTS {
        tx.execute(
            "INSERT INTO alerts (title, message, alert_type, severity) VALUES (?1, ?2, ?3, ?4)",
            params![title, message, kind, severity],
        )?;
    }

    tx.execute(
        "INSERT INTO mapping_rules (name, priority, condition_type, condition_field, condition_value, \
         target_category_id, target_vendor_id) \
         VALUES ('스타벅스 자동분류', 8, 'contains', 'counterparty', '스타벅스', 3, 6)",
        [],
    )?;
    tx.execute(
        "INSERT INTO mapping_rules (name, priority, condition_type, condition_field, condition_value, \
         target_category_id, target_department_id, target_vendor_id) \
         VALUES ('사무용품 자동분류', 7, 'contains', 'description', '사무용품', 1, 1, 1)",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

pub fn run(db: &Path) -> Result<()> {
    let mut conn = open_db(db)?;
    let existing: i64 = conn.query_row("SELECT count(*) FROM institutions", [], |r| r.get(0))?;
    if existing > 0 {
        println!("Sample data already present, nothing loaded.");
        return Ok(());
    }
    load_sample_data(&mut conn)?;
    println!("샘플 데이터가 생성되었습니다. Run `hoegye classify` to apply the sample rules.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_db;
    use crate::service;

    #[test]
    fn test_sample_data_counts() {
        let (_dir, mut conn) = test_db();
        load_sample_data(&mut conn).unwrap();
        let count = |sql: &str| -> i64 { conn.query_row(sql, [], |r| r.get(0)).unwrap() };
        assert_eq!(count("SELECT count(*) FROM transactions"), 100);
        assert_eq!(count("SELECT count(*) FROM mapping_rules WHERE is_active = 1"), 2);
        assert_eq!(count("SELECT count(*) FROM transactions WHERE classification_status = 'pending'"), 25);
        assert_eq!(count("SELECT count(*) FROM vendors"), 7);
    }

    #[test]
    fn test_sample_rules_classify_sample_data() {
        let (_dir, mut conn) = test_db();
        load_sample_data(&mut conn).unwrap();
        service::reapply_all(&mut conn).unwrap();
        let pending: i64 = conn
            .query_row(
                "SELECT count(*) FROM transactions WHERE classification_status = 'pending'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        // only the pending client fees remain: i % 4 == 0, i % 5 == 0, i % 3 != 0
        assert_eq!(pending, 3);
        let starbucks_category: i64 = conn
            .query_row("SELECT category_id FROM transactions WHERE transaction_id = 'TXN-000003'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(starbucks_category, 3);
    }
}

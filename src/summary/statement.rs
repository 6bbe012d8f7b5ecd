//! Credit card billing: which statements a purchase is charged to and for how much.

use time::Date;

use crate::{
    Error,
    expense::Expense,
    recurring::{AmountChange, YearMonth, amount_for_month},
};

/// How many months after the purchase month the first statement is.
///
/// A purchase on or before the closing day makes the next statement, anything
/// later waits for the one after.
fn statement_offset(purchase_date: Date, close_card_day: u8) -> i32 {
    if purchase_date.day() <= close_card_day { 1 } else { 2 }
}

/// The statement a purchase made on `purchase_date` is first billed on.
pub fn first_statement(purchase_date: Date, close_card_day: u8) -> Result<YearMonth, Error> {
    YearMonth::from_date(purchase_date).add_months(statement_offset(purchase_date, close_card_day))
}

/// The amount of `expense` billed on the `statement` of a card that closes on `close_card_day`.
///
/// The surcharge is added before splitting the amount over its installments.
/// A recurring expense is charged once a month from its start month, so each
/// statement carries the charge made `offset` months earlier, resolved for that month.
pub fn statement_charge(
    expense: &Expense,
    close_card_day: u8,
    changes: &[AmountChange],
    statement: YearMonth,
) -> Result<f64, Error> {
    let surcharge_rate = 1.0 + expense.surcharge / 100.0;

    if expense.is_recurring {
        let offset = statement_offset(expense.date, close_card_day);
        let charge_month = statement.add_months(-offset)?;

        if charge_month < YearMonth::from_date(expense.date) {
            return Ok(0.0);
        }

        let amount = amount_for_month(expense.amount, expense.date, true, changes, charge_month);

        return Ok(amount * surcharge_rate);
    }

    let installment = statement.months_since(first_statement(expense.date, close_card_day)?);
    let installments = i64::from(expense.installments.max(1));

    if (0..installments).contains(&installment) {
        Ok(expense.amount * surcharge_rate / installments as f64)
    } else {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use time::{
        OffsetDateTime,
        macros::{date, datetime},
    };

    use crate::{
        UserID,
        expense::Expense,
        recurring::{AmountChange, YearMonth},
    };

    use super::{first_statement, statement_charge};

    fn expense(amount: f64, date: time::Date) -> Expense {
        Expense {
            id: 1,
            user_id: UserID::new(1),
            amount,
            date,
            description: String::new(),
            category_id: None,
            is_recurring: false,
            installments: 1,
            credit_card_id: Some(1),
            surcharge: 0.0,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn month(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn purchase_on_closing_day_makes_next_statement() {
        assert_eq!(first_statement(date!(2024 - 09 - 25), 25), Ok(month(2024, 10)));
    }

    #[test]
    fn purchase_after_closing_day_waits_a_month() {
        assert_eq!(first_statement(date!(2024 - 09 - 26), 25), Ok(month(2024, 11)));
    }

    #[test]
    fn statement_wraps_into_next_year() {
        assert_eq!(first_statement(date!(2024 - 12 - 28), 25), Ok(month(2025, 2)));
    }

    #[test]
    fn single_purchase_is_billed_once_with_surcharge() {
        let purchase = Expense {
            surcharge: 10.0,
            ..expense(100.0, date!(2024 - 09 - 10))
        };

        let charges: Vec<f64> = [month(2024, 9), month(2024, 10), month(2024, 11)]
            .into_iter()
            .map(|statement| statement_charge(&purchase, 25, &[], statement).unwrap())
            .collect();

        assert_eq!(charges.len(), 3);
        assert_eq!(charges[0], 0.0);
        assert!((charges[1] - 110.0).abs() < 1e-9);
        assert_eq!(charges[2], 0.0);
    }

    #[test]
    fn installments_are_split_over_consecutive_statements() {
        let purchase = Expense {
            installments: 3,
            ..expense(300.0, date!(2024 - 11 - 30))
        };

        let charges: Vec<f64> = (0..5)
            .map(|i| {
                let statement = month(2024, 12).add_months(i).unwrap();
                statement_charge(&purchase, 25, &[], statement).unwrap()
            })
            .collect();

        assert_eq!(charges, vec![0.0, 100.0, 100.0, 100.0, 0.0]);
    }

    #[test]
    fn recurring_charge_is_resolved_for_its_charge_month() {
        let subscription = Expense {
            is_recurring: true,
            ..expense(100.0, date!(2024 - 08 - 10))
        };
        let changes = [AmountChange {
            id: 1,
            new_amount: 150.0,
            effective_date: Some(date!(2024 - 09 - 01)),
            created_at: datetime!(2024-08-20 12:00 UTC),
        }];

        let charge = |year, m| statement_charge(&subscription, 25, &changes, month(year, m)).unwrap();

        assert_eq!(charge(2024, 8), 0.0);
        assert_eq!(charge(2024, 9), 100.0);
        assert_eq!(charge(2024, 10), 150.0);
        assert_eq!(charge(2025, 3), 150.0);
    }
}

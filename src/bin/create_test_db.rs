use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::{Connection, params};
use time::{Date, OffsetDateTime, macros::date};

use budget_tracker::{
    PasswordHash, UserID, ValidatedPassword, create_user, initialize_db,
    recurring::{RecordKind, create_change_log},
};

/// A utility for creating a test database for the REST API server of budget_tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;

    initialize_db(&connection)?;

    println!("Creating test user...");
    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user("test", password_hash, &connection)?;

    println!("Creating categories...");
    let rent = insert_category(user.id, "expense", "Rent", &connection)?;
    let groceries = insert_category(user.id, "expense", "Groceries", &connection)?;
    let salary = insert_category(user.id, "income", "Salary", &connection)?;

    println!("Creating credit card...");
    connection.execute(
        "INSERT INTO credit_card (user_id, last_four_digits, brand, expire_date, credit_limit, payment_day, close_card_day)
            VALUES (?1, '1234', 'Visa', ?2, 5000.0, 28, 25)",
        params![user.id.as_i64(), date!(2028 - 12 - 31)],
    )?;
    let card_id = connection.last_insert_rowid();

    println!("Creating expenses and incomes...");
    let rent_id = insert_record(
        "INSERT INTO expense (user_id, amount, date, description, category_id, is_recurring, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        user.id,
        1200.0,
        date!(2024 - 01 - 01),
        "Rent",
        rent,
        &connection,
    )?;
    insert_record(
        "INSERT INTO expense (user_id, amount, date, description, category_id, is_recurring, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        user.id,
        85.5,
        date!(2024 - 09 - 14),
        "Weekly shop",
        groceries,
        &connection,
    )?;
    connection.execute(
        "INSERT INTO expense (user_id, amount, date, description, category_id, installments, credit_card_id, surcharge, created_at)
            VALUES (?1, 900.0, ?2, 'New laptop', NULL, 3, ?3, 2.5, ?4)",
        params![
            user.id.as_i64(),
            date!(2024 - 08 - 20),
            card_id,
            OffsetDateTime::now_utc()
        ],
    )?;
    insert_record(
        "INSERT INTO income (user_id, amount, date, description, category_id, is_recurring, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        user.id,
        4000.0,
        date!(2024 - 01 - 15),
        "Salary",
        salary,
        &connection,
    )?;

    println!("Creating change logs...");
    create_change_log(RecordKind::Expense, rent_id, 1250.0, date!(2024 - 06 - 01), &connection)?;
    create_change_log(RecordKind::Expense, rent_id, 1300.0, date!(2024 - 10 - 01), &connection)?;

    println!("Success! Log in with the username 'test' and password 'test'.");

    Ok(())
}

fn insert_category(
    user_id: UserID,
    kind: &str,
    name: &str,
    connection: &Connection,
) -> Result<i64, rusqlite::Error> {
    connection.execute(
        "INSERT INTO category (user_id, kind, name) VALUES (?1, ?2, ?3)",
        params![user_id.as_i64(), kind, name],
    )?;

    Ok(connection.last_insert_rowid())
}

fn insert_record(
    query: &str,
    user_id: UserID,
    amount: f64,
    date: Date,
    description: &str,
    category_id: i64,
    connection: &Connection,
) -> Result<i64, rusqlite::Error> {
    connection.execute(
        query,
        params![
            user_id.as_i64(),
            amount,
            date,
            description,
            category_id,
            OffsetDateTime::now_utc()
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

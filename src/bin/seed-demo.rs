//! Demo data seed script
//!
//! Fills an empty database with a small Mensa:
//! - 4 users: 1 admin, 1 staff member, 2 guests
//! - 6 dishes and 4 drinks
//! - one menu day for each of the next N days, rotating through the dishes
//!
//! Usage:
//!   DATABASE_URL=... ./seed-demo --days 14 --password Demo2024! --reset

use anyhow::{bail, Context, Result};
use chrono::{Duration, Local};
use clap::Parser;
use rust_decimal::Decimal;

use mensa_api::{
    db,
    models::{
        dish::DishRequest,
        drink::DrinkRequest,
        menu::MenuDayRequest,
        user::{SignupRequest, UserRole},
    },
    services::{
        auth::AuthService, dishes::DishService, drinks::DrinkService, menu::MenuService,
        users::UserService,
    },
};

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed the Mensa database with demo data")]
struct Args {
    /// Number of menu days to create, starting today
    #[arg(long, default_value_t = 14)]
    days: i64,

    /// Password for all demo accounts
    #[arg(long, default_value = "Demo2024!")]
    password: String,

    /// Delete all existing data first
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;

    println!("=== Seed Mensa Demo ===");

    let pool = db::create_pool(&database_url, 5)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    if args.reset {
        println!("Removing existing data...");
        sqlx::raw_sql(
            "TRUNCATE payments, order_lines, orders, menu_day_dishes, menu_day_drinks,
                      menu_days, dishes, drinks, users
             RESTART IDENTITY CASCADE",
        )
        .execute(&pool)
        .await
        .context("Failed to truncate tables")?;
    } else {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dishes")
            .fetch_one(&pool)
            .await?;
        if existing > 0 {
            bail!("Database already contains {existing} dishes; rerun with --reset");
        }
    }

    // 1. Users
    println!("Inserting users...");
    let users = [
        ("admin@mensa.demo", "Andrea", "Keller", UserRole::Admin),
        ("kueche@mensa.demo", "Marco", "Brunner", UserRole::Staff),
        ("lea@mensa.demo", "Lea", "Meier", UserRole::User),
        ("jonas@mensa.demo", "Jonas", "Widmer", UserRole::User),
    ];
    for (email, first, last, role) in users {
        let profile = AuthService::signup(
            &pool,
            &SignupRequest {
                first_name: first.into(),
                last_name: last.into(),
                email: email.into(),
                password: args.password.clone(),
            },
        )
        .await
        .with_context(|| format!("Failed to insert user {email}"))?;
        if role != UserRole::User {
            UserService::set_role(&pool, profile.id, role).await?;
        }
    }

    // 2. Catalog
    println!("Inserting dishes and drinks...");
    let dishes: [(&str, &str, i64, bool, bool, &[&str], &[&str]); 6] = [
        ("Zürcher Geschnetzeltes", "Mit Rösti", 1650, false, false, &["Kalbfleisch", "Rahm", "Kartoffeln"], &["Milch"]),
        ("Älplermagronen", "Mit Apfelmus", 1290, true, false, &["Teigwaren", "Käse", "Kartoffeln"], &["Gluten", "Milch"]),
        ("Gemüsecurry", "Mit Basmatireis", 1350, true, true, &["Kichererbsen", "Kokosmilch", "Reis"], &[]),
        ("Fischknusperli", "Mit Tartarsauce", 1480, false, false, &["Egli", "Panade"], &["Fisch", "Gluten", "Ei"]),
        ("Falafel Bowl", "Mit Hummus und Salat", 1390, true, true, &["Kichererbsen", "Sesam"], &["Sesam"]),
        ("Pouletbrust", "Mit Ofengemüse", 1550, false, false, &["Poulet", "Zucchetti", "Peperoni"], &[]),
    ];
    let mut dish_ids = Vec::new();
    for (name, description, cents, vegetarian, vegan, ingredients, allergens) in dishes {
        let dish = DishService::create(
            &pool,
            &DishRequest {
                name: name.into(),
                description: Some(description.into()),
                price: Decimal::new(cents, 2),
                vegetarian,
                vegan,
                ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
                allergens: allergens.iter().map(|s| s.to_string()).collect(),
                image_url: None,
            },
        )
        .await
        .with_context(|| format!("Failed to insert dish {name}"))?;
        dish_ids.push(dish.id);
    }

    let drinks: [(&str, i64, i32); 4] = [
        ("Mineralwasser", 350, 80),
        ("Apfelschorle", 420, 60),
        ("Eistee", 390, 40),
        ("Kaffee", 380, 200),
    ];
    let mut drink_ids = Vec::new();
    for (name, cents, stock) in drinks {
        let drink = DrinkService::create(
            &pool,
            &DrinkRequest {
                name: name.into(),
                description: None,
                price: Decimal::new(cents, 2),
                stock,
                image_url: None,
                available: true,
            },
        )
        .await
        .with_context(|| format!("Failed to insert drink {name}"))?;
        drink_ids.push(drink.id);
    }

    // 3. Menu days: three dishes per day, shifted by one each day
    println!("Inserting {} menu days...", args.days);
    let today = Local::now().date_naive();
    for offset in 0..args.days {
        let start = offset as usize;
        let todays_dishes = (0..3)
            .map(|i| dish_ids[(start + i) % dish_ids.len()])
            .collect();
        let date = today + Duration::days(offset);
        MenuService::create(
            &pool,
            &MenuDayRequest {
                date,
                dish_ids: todays_dishes,
                drink_ids: drink_ids.clone(),
            },
        )
        .await
        .with_context(|| format!("Failed to insert menu day {date}"))?;
    }

    println!("Done. Sign in as admin@mensa.demo with the demo password.");
    Ok(())
}

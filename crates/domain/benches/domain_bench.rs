use chrono::NaiveDate;
use common::EntityId;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domain::dish::{CreateDish, DishService, UnitOfMeasurement};
use domain::meal::{CourseInput, CreateMeal, Meal, MealService};
use persistence::{AggregateRoot, InMemoryDataStore};
use tokio::runtime::Runtime;

fn bench_course_insertion(c: &mut Criterion) {
    let dining_date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

    c.bench_function("add_course_shifting_run_of_50", |b| {
        b.iter(|| {
            let mut meal = Meal::new(dining_date);
            for index in 1..=50 {
                meal.add_course(index, false, 4, EntityId::new()).unwrap();
            }
            // Every insert at the front shifts the whole run.
            meal.add_course(1, true, 4, EntityId::new()).unwrap();
            black_box(meal)
        })
    });
}

fn bench_commit_cycle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dining_date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

    c.bench_function("create_dish_and_meal_commit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDataStore::new();
                let dishes = DishService::new(store.clone());
                let meals = MealService::new(store);

                let dish = dishes
                    .create_dish(
                        CreateDish::new("Pasta", 4).with_ingredient(
                            500.0,
                            UnitOfMeasurement::Gram,
                            "penne",
                        ),
                    )
                    .await
                    .unwrap();

                let meal = meals
                    .create_meal(
                        CreateMeal::new(dining_date)
                            .with_course(CourseInput::new(1, true, 4, dish.aggregate.id())),
                    )
                    .await
                    .unwrap();
                black_box(meal)
            })
        })
    });
}

criterion_group!(benches, bench_course_insertion, bench_commit_cycle);
criterion_main!(benches);

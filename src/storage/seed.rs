//! 演示数据
//!
//! 两位导师、两门课程、一名学生及其两条选课记录。

use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::models::{Agent, Course, Enrollment, User};
use crate::storage::factory::Repositories;

/// 写入演示数据
///
/// 参考数据可重复写入；已存在的选课记录保持原进度不变。
pub async fn seed_demo_data(repos: &Repositories) -> Result<()> {
    let daisy = Agent::new(
        "daisy_dollars",
        "Daisy Dollars",
        "You are Daisy Dollars. You are a strict but encouraging finance teacher.",
    );
    let tera = Agent::new(
        "tera_byte",
        "Tera Byte",
        "You are Tera Byte, an energetic and precise coding tutor. You love clean code and \
         explaining HTML tags like they are building blocks. You use emojis often 🧱🚀.",
    );

    let finance = Course::new(
        "finance_101",
        "Money 101",
        &daisy.id,
        json!({
            "modules": [{
                "id": "mod_1",
                "title": "Income",
                "objective": "Categorize transactions.",
                "success_criteria": "Identify Rent as fixed."
            }]
        }),
    );
    let html = Course::new(
        "html_hero",
        "HTML Hero: Building the Web",
        &tera.id,
        json!({
            "modules": [
                {
                    "id": "html_1",
                    "title": "The Skeleton of the Web",
                    "objective": "Write a basic HTML structure with <html>, <head>, and <body> tags.",
                    "success_criteria": "Student writes valid boilerplate."
                },
                {
                    "id": "html_2",
                    "title": "Tags & Elements",
                    "objective": "Create a paragraph <p> and a heading <h1>.",
                    "success_criteria": "Student uses tags correctly."
                }
            ]
        }),
    );

    let student = User::student(1, "lydia@homegrown.com", "Lydia");

    repos.catalog.put_agent(&daisy).await?;
    repos.catalog.put_agent(&tera).await?;
    repos.catalog.put_course(&finance).await?;
    repos.catalog.put_course(&html).await?;
    repos.catalog.put_user(&student).await?;

    for enrollment in [
        Enrollment::new(1, student.id, &finance.id),
        Enrollment::new(2, student.id, &html.id),
    ] {
        if repos.enrollments.get_by_id(enrollment.id).await?.is_none() {
            repos.enrollments.create(&enrollment).await?;
        }
    }

    info!("Demo data seeded: Daisy and Tera are ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::ModuleAdvance;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repos = Repositories::in_memory();
        seed_demo_data(&repos).await.unwrap();
        repos
            .turns
            .commit_turn(2, Some(ModuleAdvance { expected: 0, next: 1 }), &[])
            .await
            .unwrap();

        seed_demo_data(&repos).await.unwrap();

        let enrollments = repos.enrollments.list().await.unwrap();
        assert_eq!(enrollments.len(), 2);
        assert_eq!(enrollments[1].current_module_index, 1);
        assert!(repos.catalog.get_agent("tera_byte").await.unwrap().is_some());
        assert_eq!(
            repos.catalog.get_user(1).await.unwrap().unwrap().display_name,
            "Lydia"
        );
    }
}

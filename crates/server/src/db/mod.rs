pub mod annotations;
pub mod collaborators;
pub mod documents;
pub mod mentions;
pub mod models;
pub mod plans;
pub mod tags;
pub mod timeline;
pub mod users;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub use annotations::AnnotationRepo;
pub use collaborators::CollaboratorRepo;
pub use documents::DocumentRepo;
pub use mentions::MentionRepo;
pub use plans::PlanRepo;
pub use tags::TagRepo;
pub use timeline::TimelineRepo;
pub use users::UserRepo;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        // Ensure the data directory exists
        if let Some(path) = url.strip_prefix("sqlite:") {
            let path = path.split('?').next().unwrap_or(path);
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts the default plans and system tags. Safe to run on every start.
    pub async fn seed(&self) -> anyhow::Result<()> {
        PlanRepo::seed_defaults(&self.pool).await?;
        TagRepo::seed_system_tags(&self.pool).await?;
        Ok(())
    }
}

/// 数据库访问层

pub mod models;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

/// 建立数据库连接 (SeaORM)
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, anyhow::Error> {
    info!("正在连接数据库");

    let db = Database::connect(database_url).await?;
    info!("数据库连接成功");

    Ok(db)
}

/// 创建缺失的数据表（missions 依赖 robots 的外键，需按顺序创建）
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), anyhow::Error> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut robots = schema.create_table_from_entity(models::robot::Entity);
    robots.if_not_exists();
    db.execute(backend.build(&robots)).await?;

    let mut missions = schema.create_table_from_entity(models::mission::Entity);
    missions.if_not_exists();
    db.execute(backend.build(&missions)).await?;

    info!("数据表已就绪");
    Ok(())
}

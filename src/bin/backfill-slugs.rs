/// Repair visitor identifiers on existing data
/// Safe to re-run; rows that are already valid are left alone.
///
/// Usage: backfill-slugs [--database PATH] [--public-base-url URL] [--dry-run]
///   --database PATH        : SQLite file (defaults to DATABASE_PATH)
///   --public-base-url URL  : Rewrites QR code URLs to this base (defaults to PUBLIC_BASE_URL)
///   --dry-run              : Report what would change without writing

use clap::Parser;
use sqlx::SqlitePool;

use tourstack_api::{
    db,
    models::{i18n::LocalizedText, stop::Stop, tour::Tour},
    services::{
        slug::{self, slugify},
        stops::{apply_qr_code, StopService},
    },
};

#[derive(Parser)]
#[command(name = "backfill-slugs", about = "Fill in missing or invalid slugs and short codes")]
struct Args {
    #[arg(long, env = "DATABASE_PATH", default_value = "data/dev.db")]
    database: String,

    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:5173")]
    public_base_url: String,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Default)]
struct Report {
    tour_slugs: usize,
    stop_slugs: usize,
    short_codes: usize,
    qr_urls: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let pool = db::create_pool(&args.database).await?;
    db::run_migrations(&pool).await?;

    tracing::info!(
        "Backfilling {} (dry run: {})",
        args.database,
        args.dry_run
    );

    let mut report = Report::default();
    let tours: Vec<Tour> = sqlx::query_as("SELECT * FROM tours ORDER BY created_at ASC")
        .fetch_all(&pool)
        .await?;

    for tour in &tours {
        let tour_slug = backfill_tour(&pool, tour, &args, &mut report).await?;
        let stops = StopService::list_by_tour(&pool, &tour.id).await?;
        for stop in stops {
            if let Err(e) = backfill_stop(&pool, tour, &tour_slug, stop, &args, &mut report).await {
                tracing::error!("Tour {}: stop repair failed: {}", tour.id, e);
            }
        }
    }

    tracing::info!(
        "Done: {} tours scanned, {} tour slugs, {} stop slugs, {} short codes, {} QR urls {}",
        tours.len(),
        report.tour_slugs,
        report.stop_slugs,
        report.short_codes,
        report.qr_urls,
        if args.dry_run { "would change" } else { "changed" }
    );
    Ok(())
}

fn title_base(title: &LocalizedText, lang: &str, id: &str) -> String {
    slugify(title.resolve(lang, "en").unwrap_or(id))
}

async fn backfill_tour(
    pool: &SqlitePool,
    tour: &Tour,
    args: &Args,
    report: &mut Report,
) -> anyhow::Result<String> {
    if slug::is_valid_slug(&tour.slug) {
        return Ok(tour.slug.clone());
    }

    let base = title_base(&tour.title, &tour.primary_language, &tour.id);
    let new_slug = slug::unique_tour_slug(pool, &base, Some(&tour.id)).await?;
    tracing::info!("Tour {}: slug {:?} -> {:?}", tour.id, tour.slug, new_slug);
    report.tour_slugs += 1;

    if !args.dry_run {
        sqlx::query("UPDATE tours SET slug = ?2 WHERE id = ?1")
            .bind(&tour.id)
            .bind(&new_slug)
            .execute(pool)
            .await?;
    }
    Ok(new_slug)
}

async fn backfill_stop(
    pool: &SqlitePool,
    tour: &Tour,
    tour_slug: &str,
    mut stop: Stop,
    args: &Args,
    report: &mut Report,
) -> anyhow::Result<()> {
    let before = serde_json::to_value(&stop)?;

    if !slug::is_valid_slug(&stop.slug) {
        let base = title_base(&stop.title, &tour.primary_language, &stop.id);
        let new_slug = slug::unique_stop_slug(pool, &tour.id, &base, Some(&stop.id)).await?;
        tracing::info!(
            "Stop {} ({}): slug {:?} -> {:?}",
            stop.id,
            tour_slug,
            stop.slug,
            new_slug
        );
        stop.slug = new_slug;
        report.stop_slugs += 1;
    }

    if !slug::is_valid_short_code(&stop.short_code) {
        let code = slug::unused_short_code(pool).await?;
        tracing::info!("Stop {}: short code {:?} -> {:?}", stop.id, stop.short_code, code);
        stop.short_code = code;
        report.short_codes += 1;
    }

    let url = slug::short_url(&args.public_base_url, &stop.short_code);
    let code = stop.short_code.clone();
    apply_qr_code(&mut stop.content, stop.primary_positioning.as_mut(), &url, &code);

    if serde_json::to_value(&stop)? == before {
        return Ok(());
    }
    if before.get("slug") == Some(&serde_json::json!(stop.slug))
        && before.get("shortCode") == Some(&serde_json::json!(stop.short_code))
    {
        report.qr_urls += 1;
    }

    if !args.dry_run {
        StopService::save(pool, &stop).await?;
    }
    Ok(())
}

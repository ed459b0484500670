use igpsport_client::{ActivityApi, config::Config, http_client::ReqwestIgpsportClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_env()?;
    let mut client = ReqwestIgpsportClient::new(&cfg)?;

    let page_no = std::env::var("IGPSPORT_PAGE")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(1);
    let format = std::env::var("IGPSPORT_FORMAT").unwrap_or_else(|_| "fit".to_string());

    if !client.has_token() {
        client
            .login()
            .await
            .map_err(|e| format!("login failed: {}", e))?;
    }

    let page = client
        .list_activities(page_no, &format)
        .await
        .map_err(|e| format!("failed to list activities: {}", e))?;

    if page.rows.is_empty() {
        println!("No activities on page {} (total pages: {})", page_no, page.total_page);
        return Ok(());
    }

    println!(
        "Page {} of {} ({} activities in total):",
        page_no, page.total_page, page.total_rows
    );
    for row in page.rows {
        println!(
            "- {} {} {} ({:.1} km)",
            row.ride_id,
            row.start_time,
            row.title,
            row.ride_distance / 1000.0
        );
    }

    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    gov_portal_server::run().await
}

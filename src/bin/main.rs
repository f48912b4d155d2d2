#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    socialite::init_tracing();
    let config = socialite::config::Config::from_env()?;
    socialite::native::run(config).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[tokio::main]
async fn main() {
    let code = launcher_lib::run().await;
    std::process::exit(code);
}

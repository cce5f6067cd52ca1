fn main() -> anyhow::Result<()> {
    geojson_relay::cli::run()
}

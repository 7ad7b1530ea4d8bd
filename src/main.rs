fn main() -> anyhow::Result<()> {
    roster::run().map_err(|e| anyhow::anyhow!(e).context("roster failed"))
}

use crate::settings::Settings;

pub fn run(settings: &Settings, port: u16) -> anyhow::Result<()> {
    let coordinator = settings.build_coordinator()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(safe_notify_server::serve(coordinator, port))
}

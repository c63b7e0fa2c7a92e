//! Optional real-time setup for the bridge loop (Linux only).

#[cfg(target_os = "linux")]
pub fn setup_rt(priority: i32) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, mlockall, sched_param, sched_setscheduler};

    // Page faults mid-loop cost more than the locked memory; failure here
    // is survivable, degraded scheduling is not.
    let rc = unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) };
    if rc != 0 {
        tracing::warn!(
            error = %std::io::Error::last_os_error(),
            "mlockall failed, continuing without locked memory"
        );
    }

    let param = sched_param {
        sched_priority: priority,
    };
    let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(eyre::eyre!(
            "SCHED_FIFO priority {priority} refused: {} (needs CAP_SYS_NICE or root)",
            std::io::Error::last_os_error()
        ));
    }
    tracing::info!(priority, "real-time scheduling enabled");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt(_priority: i32) -> eyre::Result<()> {
    tracing::warn!("real-time mode is not supported on this platform, ignoring --rt");
    Ok(())
}

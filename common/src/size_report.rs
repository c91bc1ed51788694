/// Effective throughput of a 1Gb Ethernet link, in bytes per second.
pub const GIGABIT_EFFECTIVE_BYTES_PER_SEC: f64 = 1.18e8;
/// Rate the simulator broadcasts at.
pub const BROADCAST_HZ: f64 = 60.0;

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SizeClass {
    Bytes,
    Kilobytes(f64),
    Megabytes(f64),
    /// Above 10 MB.
    VeryLarge(f64),
    /// Above 1 GB.
    TooLarge(f64),
}

impl SizeClass {
    pub fn of(size: usize) -> Self {
        let size = size as f64;
        if size > GB {
            SizeClass::TooLarge(size / GB)
        } else if size > 10.0 * MB {
            SizeClass::VeryLarge(size / MB)
        } else if size > MB {
            SizeClass::Megabytes(size / MB)
        } else if size > KB {
            SizeClass::Kilobytes(size / KB)
        } else {
            SizeClass::Bytes
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LinkUsage {
    /// Percent of the link's effective bandwidth used at [`BROADCAST_HZ`].
    Percent(f64),
    /// The link cannot sustain [`BROADCAST_HZ`]; this is the achievable rate.
    LimitedHz(f64),
}

impl LinkUsage {
    pub fn of(size: usize, bytes_per_sec: f64) -> Self {
        let size = size.max(1) as f64;
        if bytes_per_sec / size > BROADCAST_HZ {
            LinkUsage::Percent(100.0 * size * BROADCAST_HZ / bytes_per_sec)
        } else {
            LinkUsage::LimitedHz(bytes_per_sec / size)
        }
    }
}

/// Advisory facts about a replicated record.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StateFacts {
    pub size: usize,
    pub class: SizeClass,
    pub gigabit: LinkUsage,
    pub ten_gigabit: LinkUsage,
}

impl StateFacts {
    pub fn of(size: usize) -> Self {
        Self {
            size,
            class: SizeClass::of(size),
            gigabit: LinkUsage::of(size, GIGABIT_EFFECTIVE_BYTES_PER_SEC),
            ten_gigabit: LinkUsage::of(size, 10.0 * GIGABIT_EFFECTIVE_BYTES_PER_SEC),
        }
    }
}

fn describe_link(name: &str, usage: LinkUsage) {
    match usage {
        LinkUsage::Percent(percent) => log::info!(
            "on a {name} LAN the state uses {percent:.2}% of the effective bandwidth at {BROADCAST_HZ} Hz"
        ),
        LinkUsage::LimitedHz(hz) => {
            log::warn!("on a {name} LAN the frame rate is network limited to {hz:.2} Hz")
        }
    }
}

/// Logs the size of a state record and its bandwidth footprint.
pub fn log_state_facts(size: usize) -> StateFacts {
    let facts = StateFacts::of(size);
    log::info!("state record takes {size} bytes in memory");
    match facts.class {
        SizeClass::Bytes => {}
        SizeClass::Kilobytes(kb) => log::info!("that is {kb:.2} kilobytes"),
        SizeClass::Megabytes(mb) => log::info!("that is {mb:.2} megabytes"),
        SizeClass::VeryLarge(mb) => log::warn!("that is {mb:.2} megabytes, a very big state"),
        SizeClass::TooLarge(gb) => log::warn!("that is {gb:.2} gigabytes, too big to replicate"),
    }
    describe_link("1Gb Ethernet", facts.gigabit);
    describe_link("10Gb Ethernet", facts.ten_gigabit);
    if let LinkUsage::LimitedHz(_) = facts.ten_gigabit {
        log::warn!("the state is very large");
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_reported_in_kilobytes() {
        let facts = StateFacts::of(crate::StateSnapshot::SIZE);
        match facts.class {
            SizeClass::Kilobytes(kb) => assert!((kb - 633.05).abs() < 0.01, "{kb}"),
            other => panic!("unexpected class {other:?}"),
        }
    }

    #[test]
    fn snapshot_fits_both_links_at_broadcast_rate() {
        let facts = StateFacts::of(crate::StateSnapshot::SIZE);
        match facts.gigabit {
            LinkUsage::Percent(percent) => assert!(percent > 32.0 && percent < 34.0, "{percent}"),
            other => panic!("unexpected usage {other:?}"),
        }
        match facts.ten_gigabit {
            LinkUsage::Percent(percent) => assert!(percent > 3.2 && percent < 3.4, "{percent}"),
            other => panic!("unexpected usage {other:?}"),
        }
    }

    #[test]
    fn size_classes_follow_thresholds() {
        assert_eq!(SizeClass::of(512), SizeClass::Bytes);
        assert!(matches!(SizeClass::of(2 * 1024 * 1024), SizeClass::Megabytes(_)));
        assert!(matches!(SizeClass::of(11 * 1024 * 1024), SizeClass::VeryLarge(_)));
        assert!(matches!(SizeClass::of(2 * 1024 * 1024 * 1024), SizeClass::TooLarge(_)));
    }

    #[test]
    fn huge_records_are_rate_limited() {
        match LinkUsage::of(100 * 1024 * 1024, GIGABIT_EFFECTIVE_BYTES_PER_SEC) {
            LinkUsage::LimitedHz(hz) => assert!(hz < 2.0),
            other => panic!("unexpected usage {other:?}"),
        }
    }
}

/// Profiling hooks driven by `BeginProfileBlock`/`EndProfileBlock` instructions.
///
/// `link` correlates a GPU block with the CPU-side block that recorded it; `0`
/// means no link.
pub trait Profiler: Send + Sync {
    fn begin_block(&self, name: &str, link: i64);
    fn end_block(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProfiler;

impl Profiler for NullProfiler {
    fn begin_block(&self, _name: &str, _link: i64) {}

    fn end_block(&self) {}
}

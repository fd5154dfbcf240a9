use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

use clap::Parser;
use clap::ValueEnum;
use dense_hash::DefaultHashBuilder;
use dense_hash::HashMap;
use dense_hash::TryReserveError;
use dense_hash::memory::GlobalResource;
use dense_hash::memory::MemoryResource;
use dense_hash::memory::ResourceRef;
use dense_hash::store::Contiguous;
use dense_hash::store::Segmented;
use dense_hash::store::ValueStore;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Store {
    Contiguous,
    Segmented,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "count", default_value_t = 100_000)]
    count: u64,
    #[arg(short = 's', long = "store", value_enum, default_value_t = Store::Contiguous)]
    store: Store,
    /// Remove every n-th key after filling
    #[arg(short = 'r', long = "remove_every", default_value_t = 3)]
    remove_every: u64,
    #[arg(short = 'l', long = "max_load_factor")]
    max_load_factor: Option<f32>,
}

#[derive(Default)]
struct CountingResource {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    live_bytes: Cell<usize>,
    peak_bytes: Cell<usize>,
}

impl CountingResource {
    fn report(&self, label: &str) {
        println!(
            "[{label}] allocations: {}, deallocations: {}, live: {} bytes, peak: {} bytes",
            self.allocations.get(),
            self.deallocations.get(),
            self.live_bytes.get(),
            self.peak_bytes.get()
        );
    }
}

impl MemoryResource for CountingResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
        let ptr = GlobalResource.allocate(layout)?;
        self.allocations.set(self.allocations.get() + 1);
        let live = self.live_bytes.get() + layout.size();
        self.live_bytes.set(live);
        self.peak_bytes.set(self.peak_bytes.get().max(live));
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.set(self.deallocations.get() + 1);
        self.live_bytes.set(self.live_bytes.get() - layout.size());
        // SAFETY: Every block handed out by this resource came from
        // `GlobalResource` with the same layout.
        unsafe { GlobalResource.deallocate(ptr, layout) }
    }
}

type Map<'r, St> = HashMap<u64, u64, DefaultHashBuilder, ResourceRef<'r>, St>;

fn run<'r, St>(args: &Args, resource: &'r CountingResource, copy_resource: &'r CountingResource)
where
    St: ValueStore<(u64, u64), Backend = ResourceRef<'r>>,
{
    let mut map: Map<'r, St> = HashMap::new_in(ResourceRef::from(resource));
    if let Some(max_load_factor) = args.max_load_factor {
        map.set_max_load_factor(max_load_factor);
    }

    for key in 0..args.count {
        map.insert(key, key.wrapping_mul(0x9E37_79B9));
    }
    println!(
        "Inserted {} keys: {} buckets, load factor {:.2}%",
        map.len(),
        map.bucket_count(),
        map.load_factor() * 100.0
    );
    resource.report("filled");
    map.debug_stats().print();
    map.print_probe_histogram();

    if args.remove_every > 0 {
        map.retain(|key, _| key % args.remove_every != 0);
        println!("Removed every {}th key, {} remain", args.remove_every, map.len());
        map.shrink_to_fit();
        resource.report("shrunk");
        map.debug_stats().print();
    }

    let copy = map.clone_in(ResourceRef::from(copy_resource));
    assert_eq!(copy.len(), map.len());
    copy_resource.report("copy");

    drop(copy);
    drop(map);
    resource.report("dropped");
    copy_resource.report("copy dropped");
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("Store: {:?}", args.store);
    let resource = CountingResource::default();
    let copy_resource = CountingResource::default();
    match args.store {
        Store::Contiguous => {
            run::<Contiguous<(u64, u64), ResourceRef<'_>>>(&args, &resource, &copy_resource)
        }
        Store::Segmented => {
            run::<Segmented<(u64, u64), ResourceRef<'_>>>(&args, &resource, &copy_resource)
        }
    }
}

use coronatracker_core::{AppContext, CountryStore};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn concurrent_first_get_instance_yields_one_store() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let handles = [first_dir.path().to_path_buf(), second_dir.path().to_path_buf()]
        .into_iter()
        .map(|dir| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                CountryStore::get_instance(&AppContext::new(dir)).unwrap()
            })
        })
        .collect::<Vec<_>>();

    let stores = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    assert!(std::ptr::eq(stores[0], stores[1]));
    let store = CountryStore::instance().unwrap();
    assert!(std::ptr::eq(store, stores[0]));
    assert!(
        store.context() == &AppContext::new(first_dir.path())
            || store.context() == &AppContext::new(second_dir.path())
    );
}

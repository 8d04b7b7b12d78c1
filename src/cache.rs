use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::data::loader::{load_file, LoadOptions};
use crate::data::model::EarthquakeDataset;
use crate::error::LoadError;

type CacheKey = (PathBuf, LoadOptions);

/// Process-wide memo of loaded datasets. Source files are assumed not to
/// change while the process runs, so entries are never invalidated.
static DATASETS: OnceLock<Mutex<HashMap<CacheKey, Arc<EarthquakeDataset>>>> = OnceLock::new();

/// Load `path`, or return the dataset loaded earlier for the same file and options.
/// Failed loads are not cached.
pub fn load_cached(path: &Path, options: &LoadOptions) -> Result<Arc<EarthquakeDataset>, LoadError> {
    let key = (
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
        *options,
    );
    let cache = DATASETS.get_or_init(Default::default);

    if let Some(hit) = lock(cache).get(&key) {
        log::debug!("dataset cache hit for {}", key.0.display());
        return Ok(Arc::clone(hit));
    }

    let dataset = Arc::new(load_file(path, options)?);
    let mut guard = lock(cache);
    let entry = guard.entry(key).or_insert(dataset);
    Ok(Arc::clone(entry))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Entries are inserted whole, so a poisoned map is still consistent.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn second_load_returns_the_same_dataset() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "latitude,longitude,magnitude,depth,date_time,alert,tsunami,sig,net,nst,dmin,gap,magType,location,continent,country,title"
        )
        .unwrap();
        writeln!(file, "1,2,6.0,10,2020-02-02 10:00,,0,600,us,40,0.5,20,mww,here,Asia,Japan,t").unwrap();
        file.flush().unwrap();

        let options = LoadOptions::default();
        let a = load_cached(file.path(), &options).unwrap();
        let b = load_cached(file.path(), &options).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let strict = LoadOptions {
            drop_missing_continent: true,
        };
        let c = load_cached(file.path(), &strict).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn concurrent_first_loads_share_one_entry() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "latitude,longitude,magnitude,depth,date_time,alert,tsunami,sig,net,nst,dmin,gap,magType,location,continent,country,title"
        )
        .unwrap();
        writeln!(file, "5,6,7.0,33,2011-03-11 05:46,red,1,2000,us,500,1.0,10,mww,sea,Asia,Japan,t").unwrap();
        file.flush().unwrap();

        let path = file.path().to_path_buf();
        let loaded: Vec<Arc<EarthquakeDataset>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| load_cached(&path, &LoadOptions::default()).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(loaded[0].len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let path = Path::new("/no/such/quakes.csv");
        assert!(load_cached(path, &LoadOptions::default()).is_err());
        assert!(load_cached(path, &LoadOptions::default()).is_err());
    }
}

mod aggregate;
mod analysis;
mod disk;
mod enhanced;
mod error;
mod format;
mod ingest;
mod io;
mod memory;
mod observability;
mod schema;
mod store;
mod value;

pub use aggregate::{Direction, Extremum, MinMax};
pub use analysis::{append_outputs, extreme_values, Category, ExtremeValues, Output, RESULT_HEADER};
pub use disk::{DiskStore, Layout};
pub use enhanced::EnhancedDiskStore;
pub use error::{Result, StoreError};
pub use format::{CHANGI, PAYA_LEBAR};
pub use ingest::RowBatch;
pub use memory::MemoryStore;
pub use schema::{
    ColumnDef, DataType, Schema, HUMIDITY_COLUMN, ID_COLUMN, STATION_COLUMN, TEMPERATURE_COLUMN,
    TIMESTAMP_COLUMN,
};
pub use store::{Predicate, Store};
pub use value::{cast_value, parse_value, IndexSet, Value, NULL_TOKEN, TIMESTAMP_FORMAT};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const HEADER: &str = "id,Timestamp,Station,Temperature,Humidity";

    /// The same batch loaded into all three backends.
    struct Backends {
        _dir: TempDir,
        stores: Vec<Box<dyn Store>>,
    }

    fn load(csv: &str) -> Backends {
        let dir = TempDir::new().unwrap();
        let batch = RowBatch::from_reader(csv.as_bytes()).unwrap();
        let mut stores: Vec<Box<dyn Store>> = vec![
            Box::new(MemoryStore::new(Schema::weather())),
            Box::new(DiskStore::create(dir.path(), Schema::weather()).unwrap()),
            Box::new(EnhancedDiskStore::create(dir.path(), Schema::weather()).unwrap()),
        ];
        for store in &mut stores {
            store.ingest(&batch).unwrap();
        }
        Backends { _dir: dir, stores }
    }

    fn agree<T: PartialEq + std::fmt::Debug>(backends: &Backends, query: impl Fn(&dyn Store) -> T) -> T {
        let expected = query(backends.stores[0].as_ref());
        for store in &backends.stores[1..] {
            assert_eq!(query(store.as_ref()), expected, "backend {}", store.name());
        }
        expected
    }

    const SAMPLE: &str = "id,Timestamp,Station,Temperature,Humidity\n\
                          1,2009-01-01 00:00,Paya Lebar,25.5,80\n\
                          2,2009-01-01 00:30,Changi,NaN,82\n\
                          3,M,Paya Lebar,27.0,M\n\
                          4,2009-02-01 01:30,Paya Lebar,27.0,79\n\
                          -2147483648,2009-02-01 02:00,M,26.0,79\n";

    #[test]
    fn test_backend_names() {
        let b = load(SAMPLE);
        let names: Vec<_> = b.stores.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["main_memory", "disk", "enhanced_disk"]);
    }

    #[test]
    fn test_sentinels_are_null_everywhere() {
        let b = load(SAMPLE);
        assert_eq!(agree(&b, |s| s.get_value(TEMPERATURE_COLUMN, 1)), None);
        assert_eq!(agree(&b, |s| s.get_value("id", 4)), None);
        assert_eq!(agree(&b, |s| s.get_value(STATION_COLUMN, 4)), None);
        assert_eq!(agree(&b, |s| s.get_value(TIMESTAMP_COLUMN, 2)), None);
        assert_eq!(agree(&b, |s| s.filter(TEMPERATURE_COLUMN, &|_| true)), vec![0, 2, 3, 4]);
        assert_eq!(agree(&b, |s| s.get_max(TEMPERATURE_COLUMN, &[0, 1, 2, 3, 4])), vec![2, 3]);
        assert_eq!(agree(&b, |s| s.get_min("id", &[0, 1, 2, 3, 4])), vec![0]);
        assert_eq!(agree(&b, |s| s.filter(STATION_COLUMN, &|_| true)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_huge_index_is_not_found_everywhere() {
        let b = load(SAMPLE);
        for index in [usize::MAX, usize::MAX / 2, usize::MAX / 4 + 1] {
            assert_eq!(agree(&b, |s| s.get_value("id", index)), None);
            assert_eq!(agree(&b, |s| s.get_value(TIMESTAMP_COLUMN, index)), None);
            assert!(agree(&b, |s| s.filter_in(TEMPERATURE_COLUMN, &|_| true, &[index])).is_empty());
            assert!(agree(&b, |s| s.get_max(HUMIDITY_COLUMN, &[0, index])).is_empty());
        }
        assert_eq!(agree(&b, |s| s.get_value("id", 0)), Some(Value::Int(1)));
    }

    #[test]
    fn test_filter_chain_is_and() {
        let b = load(SAMPLE);
        let feb = agree(&b, |s| {
            s.filter(TIMESTAMP_COLUMN, &|v| v.as_timestamp().is_some_and(|t| t.month() == 2))
        });
        assert_eq!(feb, vec![3, 4]);
        let paya_feb = agree(&b, |s| {
            s.filter_in(STATION_COLUMN, &|v| v.as_str() == Some("Paya Lebar"), &feb)
        });
        assert_eq!(paya_feb, vec![3]);
        assert_eq!(agree(&b, |s| s.head(2)).len(), 5);
    }

    #[test]
    fn test_ingest_rejects_wrong_header() {
        let dir = TempDir::new().unwrap();
        let batch = RowBatch::from_reader("id,When,Station\n1,x,Changi\n".as_bytes()).unwrap();
        let mut store = DiskStore::create(dir.path(), Schema::weather()).unwrap();
        assert!(matches!(store.ingest(&batch), Err(StoreError::SchemaMismatch(_))));
        assert_eq!(store.row_count().unwrap(), 0);
    }

    fn arb_row() -> impl Strategy<Value = String> {
        let id = prop_oneof![Just("M".to_string()), (-50i32..50).prop_map(|v| v.to_string())];
        let timestamp = prop_oneof![
            Just("M".to_string()),
            (2019i16..=2021, 1i8..=12, 1i8..=28, 0i8..24)
                .prop_map(|(y, m, d, h)| format!("{y}-{m:02}-{d:02} {h:02}:00")),
        ];
        let station = prop_oneof![Just("Paya Lebar"), Just("Changi"), Just("M")];
        let reading = |lo: i32, hi: i32| {
            prop_oneof![
                1 => Just("M".to_string()),
                4 => (lo..hi).prop_map(|v| format!("{}", v as f32 / 2.0)),
            ]
        };
        (id, timestamp, station, reading(40, 70), reading(100, 200)).prop_map(
            |(id, ts, station, temp, hum)| format!("{id},{ts},{station},{temp},{hum}"),
        )
    }

    fn arb_csv() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_row(), 0..40).prop_map(|rows| {
            std::iter::once(HEADER.to_string())
                .chain(rows)
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_backends_agree(csv in arb_csv(), threshold in 20.0f32..35.0, year in 2019i16..=2021) {
            let b = load(&csv);
            let rows = agree(&b, |s| s.row_count().unwrap());
            let all: Vec<usize> = (0..rows).collect();

            let in_year = agree(&b, |s| {
                s.filter(TIMESTAMP_COLUMN, &|v| v.as_timestamp().is_some_and(|t| t.year() == year))
            });
            let warm = agree(&b, |s| {
                s.filter_in(TEMPERATURE_COLUMN, &|v| v.as_f32().is_some_and(|x| x > threshold), &in_year)
            });
            prop_assert!(warm.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(warm.iter().all(|i| in_year.contains(i)));

            for column in ["id", TEMPERATURE_COLUMN, HUMIDITY_COLUMN] {
                let max = agree(&b, |s| s.get_max(column, &all));
                let min = agree(&b, |s| s.get_min(column, &all));
                let non_null = agree(&b, |s| s.filter(column, &|_| true));
                prop_assert_eq!(max.is_empty(), non_null.is_empty());
                prop_assert_eq!(min.is_empty(), non_null.is_empty());
            }
            for i in 0..rows {
                for def in Schema::weather().columns() {
                    agree(&b, |s| s.get_value(&def.name, i));
                }
            }
        }

        #[test]
        fn prop_extreme_values_agree(csv in arb_csv(), year in 2019i16..=2021) {
            let b = load(&csv);
            let sort = |mut out: Vec<Output>| {
                out.sort_by(|a, b| {
                    (a.timestamp, a.category)
                        .cmp(&(b.timestamp, b.category))
                        .then(a.value.total_cmp(&b.value))
                });
                out
            };
            for station in ["Paya Lebar", "Changi"] {
                let expected = sort(extreme_values(b.stores[0].as_ref(), year, station));
                for store in &b.stores[1..] {
                    prop_assert_eq!(&sort(extreme_values(store.as_ref(), year, station)), &expected);
                }
            }
        }
    }
}

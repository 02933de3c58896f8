use hdf5::types::{FixedAscii, VarLenUnicode};
use hdfits::hdf::{read_hdf, write_hdf, Compression, HdfOptions, TableLayout};
use hdfits::hdu::{Column, Data, ElementType, HduList, Header, HeaderValue};

mod common;

#[test]
fn small_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.h5");

    write_hdf(&common::small_table(), &path, &HdfOptions::default()).unwrap();
    let back = read_hdf(&path).unwrap();

    assert_eq!(back.names().collect::<Vec<_>>(), vec!["PRIMARY", "DATA"]);

    let t = back.get("DATA").unwrap().table().unwrap();
    assert_eq!(t.n_rows(), 3);
    assert_eq!(t.column("X").unwrap().values::<i32>().unwrap(), vec![1, 2, 3]);
    assert_eq!(t.column("X").unwrap().unit(), None);

    let flux = t.column("FLUX").unwrap();
    assert_eq!(flux.values::<f32>().unwrap(), vec![1.5, 2.5, 3.5]);
    assert_eq!(flux.unit(), Some("Jy"));
}

#[test]
fn sample_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.h5");

    write_hdf(&common::sample(), &path, &HdfOptions::default()).unwrap();
    let back = read_hdf(&path).unwrap();

    common::check_sample(&back);
    assert_eq!(
        back.get("PRIMARY").unwrap().header().history(),
        &["step one".to_string(), "step two".to_string()]
    );
}

#[test]
fn layout_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.h5");

    write_hdf(&common::sample(), &path, &HdfOptions::default()).unwrap();

    let f = hdf5::File::open(&path).unwrap();
    let class = |loc: &hdf5::Location| -> String {
        loc.attr("CLASS")
            .unwrap()
            .read_scalar::<hdf5::types::VarLenUnicode>()
            .unwrap()
            .to_string()
    };

    assert_eq!(class(&f), "HDFITS");

    let primary = f.group("PRIMARY").unwrap();
    assert_eq!(class(&primary), "HDU");
    assert!(primary.dataset("DATA").is_err());
    assert_eq!(primary.dataset("HISTORY").unwrap().shape(), vec![2]);
    assert_eq!(
        primary
            .attr("NCHAN")
            .unwrap()
            .read_scalar::<i64>()
            .unwrap(),
        64
    );
    assert_eq!(
        primary
            .attr("TELESCOP_COMMENT")
            .unwrap()
            .read_scalar::<hdf5::types::VarLenUnicode>()
            .unwrap()
            .as_str(),
        "telescope name"
    );

    let image = f.dataset("SCI/DATA").unwrap();
    assert_eq!(class(&image), "IMAGE");
    assert_eq!(image.shape(), vec![4, 6]);
    assert_eq!(
        image.attr("IMAGE_MINMAXRANGE").unwrap().read_raw::<f64>().unwrap(),
        vec![0.0, 23.0]
    );

    let table = f.dataset("EVENTS/DATA").unwrap();
    assert_eq!(class(&table), "TABLE");
    assert_eq!(table.shape(), vec![3]);
    assert_eq!(table.attr("NROWS").unwrap().read_scalar::<u64>().unwrap(), 3);
    assert_eq!(
        table
            .attr("FIELD_1_UNITS")
            .unwrap()
            .read_scalar::<hdf5::types::VarLenUnicode>()
            .unwrap()
            .as_str(),
        "Jy"
    );
}

#[test]
fn data_group_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("group.h5");

    let opts = HdfOptions {
        table_layout: TableLayout::DataGroup,
        ..Default::default()
    };
    write_hdf(&common::sample(), &path, &opts).unwrap();

    {
        let f = hdf5::File::open(&path).unwrap();
        let flux = f.dataset("EVENTS/DATA/FLUX").unwrap();
        assert_eq!(flux.attr("COLUMN_ID").unwrap().read_scalar::<i64>().unwrap(), 2);
        assert!(f.dataset("EVENTS/DATA/X").unwrap().attr("UNITS").is_err());
    }

    common::check_sample(&read_hdf(&path).unwrap());
}

#[test]
fn compressed() {
    let dir = tempfile::tempdir().unwrap();

    for (i, compression) in [Compression::Gzip(4), Compression::Lzf, Compression::Bitshuffle]
        .into_iter()
        .enumerate()
    {
        let path = dir.path().join(format!("compressed{i}.h5"));
        let opts = HdfOptions {
            compression,
            shuffle: true,
            checksum: true,
            ..Default::default()
        };

        write_hdf(&common::sample(), &path, &opts).unwrap();
        common::check_sample(&read_hdf(&path).unwrap());
    }
}

#[test]
fn gzip_is_chunked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gzip.h5");

    let mut hdus = HduList::new();
    hdus.add_image("IMG", vec![0u16; 5000], Header::new()).unwrap();

    let opts = HdfOptions {
        compression: Compression::Gzip(6),
        ..Default::default()
    };
    write_hdf(&hdus, &path, &opts).unwrap();

    let f = hdf5::File::open(&path).unwrap();
    let ds = f.dataset("IMG/DATA").unwrap();
    assert_eq!(ds.chunk(), Some(vec![1024]));
    assert!(ds.is_chunked());
}

#[test]
fn empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.h5");

    let mut hdus = HduList::new();
    hdus.add_table(
        "NOROWS",
        [
            Column::new("A", Data::empty(ElementType::F64)),
            Column::new("B", Data::empty(ElementType::I32)).with_unit("m"),
        ],
        Header::new(),
    )
    .unwrap();
    hdus.add_table("NOCOLS", Vec::<Column>::new(), Header::new())
        .unwrap();

    let opts = HdfOptions {
        compression: Compression::Gzip(4),
        ..Default::default()
    };
    write_hdf(&hdus, &path, &opts).unwrap();
    let back = read_hdf(&path).unwrap();

    let t = back.get("NOROWS").unwrap().table().unwrap();
    assert_eq!(t.n_rows(), 0);
    assert_eq!(t.names().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(t.column("B").unwrap().unit(), Some("m"));

    let t = back.get("NOCOLS").unwrap().table().unwrap();
    assert_eq!(t.n_columns(), 0);
}

#[test]
fn order_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("order.h5");

    let mut header = Header::new();
    for key in ["ZETA", "ALPHA", "MID"] {
        header.insert(key, 1i64);
    }

    let mut hdus = HduList::new();
    for name in ["Z", "B", "A"] {
        hdus.add_primary(name, header.clone()).unwrap();
    }

    write_hdf(&hdus, &path, &HdfOptions::default()).unwrap();
    let back = read_hdf(&path).unwrap();

    assert_eq!(back.names().collect::<Vec<_>>(), vec!["Z", "B", "A"]);
    assert_eq!(
        back.get("A").unwrap().header().keys().collect::<Vec<_>>(),
        vec!["ZETA", "ALPHA", "MID"]
    );
}

#[test]
fn not_hdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("text.h5");
    std::fs::write(&path, "not hdf5").unwrap();

    assert!(read_hdf(&path).is_err());
}

#[test]
fn trailing_blanks_are_kept() {
    let dir = tempfile::tempdir().unwrap();

    let mut hdus = HduList::new();
    hdus.add_table(
        "NAMES",
        [Column::new("NAME", vec!["a ", " b", "c"])],
        Header::new(),
    )
    .unwrap();

    for layout in [TableLayout::Table, TableLayout::DataGroup] {
        let path = dir.path().join(format!("blanks_{layout:?}.h5"));
        let opts = HdfOptions {
            table_layout: layout,
            ..Default::default()
        };

        write_hdf(&hdus, &path, &opts).unwrap();
        let back = read_hdf(&path).unwrap();

        let t = back.get("NAMES").unwrap().table().unwrap();
        assert_eq!(
            t.column("NAME").unwrap().values::<String>().unwrap(),
            vec!["a ", " b", "c"]
        );
    }
}

fn fixed_attr(loc: &hdf5::Location, name: &str, value: &str) {
    loc.new_attr::<FixedAscii<16>>()
        .create(name)
        .unwrap()
        .write_scalar(&FixedAscii::<16>::from_ascii(value.as_bytes()).unwrap())
        .unwrap();
}

fn str_attr(loc: &hdf5::Location, name: &str, value: &str) {
    loc.new_attr::<VarLenUnicode>()
        .create(name)
        .unwrap()
        .write_scalar(&value.parse::<VarLenUnicode>().unwrap())
        .unwrap();
}

/// A file without root CLASS, as older writers left them, with one unknown DATA class.
#[test]
fn foreign_layouts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.h5");

    {
        let f = hdf5::File::create(&path).unwrap();

        let primary = f.create_group("PRIMARY").unwrap();
        str_attr(&primary, "CLASS", "HDU");
        str_attr(&primary, "OBJECT", "M31");

        let bogus = f.create_group("BOGUS").unwrap();
        str_attr(&bogus, "CLASS", "HDU");
        let ds = bogus
            .new_dataset_builder()
            .with_data(&[1i32, 2, 3][..])
            .create("DATA")
            .unwrap();
        str_attr(&ds, "CLASS", "BOGUS");

        let legacy = f.create_group("LEGACY").unwrap();
        fixed_attr(&legacy, "CLASS", "HDU");
        let data = legacy.create_group("DATA").unwrap();
        fixed_attr(&data, "CLASS", "DATA_GROUP");

        for (name, id, values) in [("A", 2i64, [1.0f64, 2.0]), ("B", 1, [3.0, 4.0])] {
            let ds = data
                .new_dataset_builder()
                .with_data(&values[..])
                .create(name)
                .unwrap();
            fixed_attr(&ds, "CLASS", "COLUMN");
            fixed_attr(&ds, "UNITS", "m");
            ds.new_attr::<i64>()
                .shape(1)
                .create("COLUMN_ID")
                .unwrap()
                .write_raw(&[id][..])
                .unwrap();
        }
    }

    let hdus = read_hdf(&path).unwrap();

    // Untracked files list by name.
    assert_eq!(hdus.names().collect::<Vec<_>>(), vec!["LEGACY", "PRIMARY"]);

    let primary = hdus.get("PRIMARY").unwrap();
    assert!(primary.is_primary());
    assert_eq!(
        primary.header().get("OBJECT"),
        Some(&HeaderValue::from("M31"))
    );

    let t = hdus.get("LEGACY").unwrap().table().unwrap();
    assert_eq!(t.names().collect::<Vec<_>>(), vec!["B", "A"]);
    assert_eq!(t.column("B").unwrap().values::<f64>().unwrap(), vec![3.0, 4.0]);
    assert_eq!(t.column("A").unwrap().unit(), Some("m"));
    assert!(hdus.get("LEGACY").unwrap().header().is_empty());
}

#![allow(dead_code)]

use hdfits::hdu::{Column, Complex, HduList, Header};
use ndarray::{Array2, Array3};

/// Primary header, a 2-D image and a table with most column kinds.
pub fn sample() -> HduList {
    let mut hdus = HduList::new();

    let mut primary = Header::new();
    primary.insert_with_comment("TELESCOP", "LOFAR", "telescope name");
    primary.insert("NCHAN", 64i64);
    primary.insert("EXPTIME", 12.5);
    primary.insert("SIMULATE", false);
    primary.add_comment("A sample file");
    primary.add_history("step one");
    primary.add_history("step two");
    hdus.add_primary("PRIMARY", primary).unwrap();

    let image = Array2::from_shape_fn((4, 6), |(i, j)| (i * 6 + j) as f32).into_dyn();
    let mut header = Header::new();
    header.insert_with_comment("BUNIT", "Jy/beam", "pixel unit");
    hdus.add_image("SCI", image, header).unwrap();

    let cells = Array3::from_shape_fn((3, 2, 2), |(r, i, j)| (r * 4 + i * 2 + j) as i16).into_dyn();

    hdus.add_table(
        "EVENTS",
        [
            Column::new("X", vec![1i32, 2, 3]),
            Column::new("FLUX", vec![1.5f32, 2.5, 3.5]).with_unit("Jy"),
            Column::new("TIME", vec![0.25f64, 0.5, 0.75]).with_unit("s"),
            Column::new("NAME", vec!["alpha", "beta", "c"]),
            Column::new(
                "VIS",
                vec![
                    Complex::new(1.0f32, -1.0),
                    Complex::new(2.0, 0.5),
                    Complex::new(0.0, 3.0),
                ],
            ),
            Column::new("CELL", cells),
        ],
        Header::new(),
    )
    .unwrap();

    hdus
}

/// The example table from the documentation.
pub fn small_table() -> HduList {
    let mut hdus = HduList::new();
    hdus.add_primary("PRIMARY", Header::new()).unwrap();
    hdus.add_table(
        "DATA",
        [
            Column::new("X", vec![1i32, 2, 3]),
            Column::new("FLUX", vec![1.5f32, 2.5, 3.5]).with_unit("Jy"),
        ],
        Header::new(),
    )
    .unwrap();
    hdus
}

/// Check that `back` holds the data of [`sample`].
pub fn check_sample(back: &HduList) {
    let names: Vec<_> = back.names().collect();
    assert_eq!(names, vec!["PRIMARY", "SCI", "EVENTS"]);

    let primary = back.get("PRIMARY").unwrap();
    assert!(primary.is_primary());
    let h = primary.header();
    assert_eq!(h.get("TELESCOP"), Some(&"LOFAR".into()));
    assert_eq!(h.comment_of("TELESCOP"), Some("telescope name"));
    assert_eq!(h.get("NCHAN"), Some(&64i64.into()));
    assert_eq!(h.get("EXPTIME"), Some(&12.5f64.into()));
    assert_eq!(h.get("SIMULATE"), Some(&false.into()));
    assert_eq!(h.comment(), &["A sample file".to_string()]);
    assert!(h.history().starts_with(&["step one".to_string(), "step two".to_string()]));

    let sci = back.get("SCI").unwrap();
    let image = sci.image().unwrap();
    assert_eq!(image.shape(), &[4, 6]);
    assert_eq!(image.to_vec::<f32>().unwrap()[7], 7.0);
    assert_eq!(sci.header().get("BUNIT"), Some(&"Jy/beam".into()));

    let t = back.get("EVENTS").unwrap().table().unwrap();
    assert_eq!(t.n_rows(), 3);
    assert_eq!(
        t.names().collect::<Vec<_>>(),
        vec!["X", "FLUX", "TIME", "NAME", "VIS", "CELL"]
    );
    assert_eq!(t.column("X").unwrap().values::<i32>().unwrap(), vec![1, 2, 3]);
    assert_eq!(t.column("FLUX").unwrap().unit(), Some("Jy"));
    assert_eq!(
        t.column("TIME").unwrap().values::<f64>().unwrap(),
        vec![0.25, 0.5, 0.75]
    );
    assert_eq!(t.column("X").unwrap().unit(), None);
    assert_eq!(
        t.column("NAME").unwrap().values::<String>().unwrap(),
        vec!["alpha", "beta", "c"]
    );
    assert_eq!(
        t.column("VIS").unwrap().values::<Complex<f32>>().unwrap()[1],
        Complex::new(2.0, 0.5)
    );

    let cell = t.column("CELL").unwrap();
    assert_eq!(cell.cell_shape(), &[2, 2]);
    assert_eq!(cell.values::<i16>().unwrap(), (0..12).collect::<Vec<i16>>());
}

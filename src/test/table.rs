use crate::attributes::AttributeTable;

/// Three rows with an id, a name, an integer population and a latitude.
pub(crate) fn cities() -> AttributeTable {
    let mut table = AttributeTable::with_headings(vec![
        "id".to_string(),
        "name".to_string(),
        "population".to_string(),
        "latitude".to_string(),
    ]);
    for row in [
        ["1", "London", "8982000", "51.5074"],
        ["2", "Paris", "2161000", "48.8566"],
        ["3", "Zürich", "421878", "47.3769"],
    ] {
        table
            .push_row(row.iter().map(|cell| cell.to_string()).collect())
            .unwrap();
    }
    table
}

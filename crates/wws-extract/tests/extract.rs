use wws_extract::{ExtractError, ListMode, extract, extract_rows};
use wws_model::{ExtractOptions, Value};

const WD: &str = r#"xmlns:wd="urn:com.workday/bsvc""#;

fn response(records: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
  <env:Body>
    <wd:Get_Journals_Response {WD}>
      <wd:Response_Results><wd:Total_Pages>1</wd:Total_Pages></wd:Response_Results>
      <wd:Response_Data>{records}</wd:Response_Data>
    </wd:Get_Journals_Response>
  </env:Body>
</env:Envelope>"#
    )
    .into_bytes()
}

fn journal(number: &str, lines: &[&str]) -> String {
    let lines: String = lines
        .iter()
        .map(|memo| {
            format!(
                "<wd:Journal_Entry_Line_Data>\
                   <wd:Memo>{memo}</wd:Memo>\
                   <wd:Worktags_Reference>\
                     <wd:ID wd:type=\"WID\">w-{memo}</wd:ID>\
                     <wd:ID wd:type=\"Cost_Center_Reference_ID\">CC-{memo}</wd:ID>\
                   </wd:Worktags_Reference>\
                 </wd:Journal_Entry_Line_Data>"
            )
        })
        .collect();
    format!(
        "<wd:Journal_Entry><wd:Journal_Entry_Data>\
           <wd:Journal_Number>{number}</wd:Journal_Number>\
           {lines}\
         </wd:Journal_Entry_Data></wd:Journal_Entry>"
    )
}

#[test]
fn one_row_per_record_without_fan_out() {
    let records: String = ["J-1", "J-2", "J-3"]
        .iter()
        .map(|number| journal(number, &["only"]))
        .collect();
    let extracted = extract_rows(
        &[response(&records)],
        "Journal_Entry_Data",
        &["Journal_Number", "Journal_Entry_Line_Data>>Memo^^Line_Memo"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert_eq!(extracted.rows.len(), 3);
    insta::assert_snapshot!(extracted.columns.join(","), @"Journal_Number,Line_Memo");
}

#[test]
fn fan_out_yields_one_row_per_match() {
    let extracted = extract_rows(
        &[response(&journal("J-1", &["a", "b", "c", "d"]))],
        "Journal_Entry_Data",
        &["Journal_Number", "Journal_Entry_Line_Data>>Memo"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert_eq!(extracted.rows.len(), 4);
    for (row, memo) in extracted.rows.iter().zip(["a", "b", "c", "d"]) {
        assert_eq!(row.text("Journal_Number"), Some("J-1"));
        assert_eq!(row.text("Memo"), Some(memo));
        assert_eq!(row.len(), 2);
    }
}

#[test]
fn collections_pack_matches_in_document_order() {
    let options = ExtractOptions::default().with_allow_collections(true);
    let extracted = extract_rows(
        &[response(&journal("J-1", &["a", "b", "c"]))],
        "Journal_Entry_Data",
        &["Journal_Number", "Journal_Entry_Line_Data>>Memo"],
        &options,
    )
    .expect("extract");
    assert_eq!(extracted.rows.len(), 1);
    let memos = extracted.rows[0]
        .get("Memo")
        .and_then(Value::as_list)
        .expect("list cell");
    assert_eq!(
        memos,
        &[Some("a".to_string()), Some("b".to_string()), Some("c".to_string())]
    );
}

#[test]
fn nested_anchor_across_two_documents() {
    let documents = vec![
        response(&journal("J-1", &["a", "b"])),
        response(&journal("J-2", &["c", "d", "e"])),
    ];
    let extracted = extract_rows(
        &documents,
        "Journal_Entry_Data",
        &[
            "Journal_Number",
            "*Journal_Entry_Line_Data",
            "Memo",
            "Worktags_Reference>>ID[@wd:type='Cost_Center_Reference_ID']",
        ],
        &ExtractOptions::default(),
    )
    .expect("extract");

    assert_eq!(extracted.rows.len(), 5);
    insta::assert_snapshot!(
        extracted.columns.join(","),
        @"Journal_Number,Memo,Cost_Center_Reference_ID"
    );
    let summary: Vec<(Option<&str>, Option<&str>, Option<&str>)> = extracted
        .rows
        .iter()
        .map(|row| {
            (
                row.text("Journal_Number"),
                row.text("Memo"),
                row.text("Cost_Center_Reference_ID"),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some("J-1"), Some("a"), Some("CC-a")),
            (Some("J-1"), Some("b"), Some("CC-b")),
            (Some("J-2"), Some("c"), Some("CC-c")),
            (Some("J-2"), Some("d"), Some("CC-d")),
            (Some("J-2"), Some("e"), Some("CC-e")),
        ]
    );
}

#[test]
fn or_chain_records_first_single_match() {
    let record = format!(
        "<wd:Item {WD}>\
           <wd:Foo><wd:Baz wd:type=\"Y_Type\">y</wd:Baz></wd:Foo>\
         </wd:Item>"
    );
    let extracted = extract_rows(
        &[response(&record)],
        "Item",
        &["Foo>>Bar[@wd:type='X_Type']||Foo>>Baz[@wd:type='Y_Type']|=Kind"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert_eq!(extracted.rows.len(), 1);
    assert_eq!(extracted.rows[0].text("Kind"), Some("Y_Type"));
    insta::assert_snapshot!(extracted.columns.join(","), @"Kind");
}

#[test]
fn or_chain_prefers_earlier_alternative() {
    let record = format!(
        "<wd:Item {WD}>\
           <wd:Ref>\
             <wd:ID wd:type=\"B_ID\">b</wd:ID>\
             <wd:ID wd:type=\"C_ID\">c</wd:ID>\
           </wd:Ref>\
         </wd:Item>"
    );
    let extracted = extract_rows(
        &[response(&record)],
        "Item",
        &[
            "Ref>>ID[@wd:type='A_ID']||Ref>>ID[@wd:type='B_ID']||Ref>>ID[@wd:type='C_ID']|=Worktag_Type^^Worktag",
        ],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert_eq!(extracted.rows[0].text("Worktag_Type"), Some("B_ID"));
    assert_eq!(extracted.rows[0].text("Worktag"), Some("b"));
}

#[test]
fn wildcards_and_attributes() {
    let record = format!(
        "<wd:Worker {WD} wd:Primary=\"1\">\
           <wd:Start_Date>2024-01-01</wd:Start_Date>\
           <wd:End_Date>2024-12-31</wd:End_Date>\
           <wd:Position wd:Primary_Job=\"true\">\
             <wd:Ref><wd:ID wd:type=\"Position_ID\">P-7</wd:ID></wd:Ref>\
           </wd:Position>\
         </wd:Worker>"
    );
    let extracted = extract_rows(
        &[response(&record)],
        "Worker",
        &[
            "@@Primary^^Primary",
            "Position>>@@Primary_Job",
            "Position>>Ref>>%position?=type%^^Position",
            "%start?=tag%^^Start",
        ],
        &ExtractOptions::default(),
    )
    .expect("extract");
    let row = &extracted.rows[0];
    assert_eq!(row.text("Primary"), Some("1"));
    assert_eq!(row.text("Primary_Job"), Some("true"));
    assert_eq!(row.text("Position"), Some("P-7"));
    assert_eq!(row.text("Start"), Some("2024-01-01"));
}

#[test]
fn tag_wildcard_matches_any_namespace() {
    let record = format!(
        "<wd:Worker {WD} xmlns:ext=\"urn:example:ext\">\
           <ext:Hire_Date_Override>2023-05-01</ext:Hire_Date_Override>\
         </wd:Worker>"
    );
    let extracted = extract_rows(
        &[response(&record)],
        "Worker",
        &["%hire?=tag%^^Hire"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert_eq!(extracted.rows[0].text("Hire"), Some("2023-05-01"));
}

#[test]
fn root_element_is_not_a_record() {
    let document = format!(
        "<wd:Worker {WD}><wd:Worker><wd:Worker_ID>inner</wd:Worker_ID></wd:Worker></wd:Worker>"
    );
    let extracted = extract_rows(
        &[document.into_bytes()],
        "Worker",
        &["Worker_ID"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert_eq!(extracted.rows.len(), 1);
    assert_eq!(extracted.rows[0].text("Worker_ID"), Some("inner"));

    let lone = format!("<wd:Worker {WD}><wd:Worker_ID>root</wd:Worker_ID></wd:Worker>");
    let extracted = extract_rows(
        &[lone.into_bytes()],
        "Worker",
        &["Worker_ID"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert!(extracted.rows.is_empty());
}

#[test]
fn flatten_all_shortens_long_keys() {
    let long = "Very_Long_Element_Name_That_Keeps_Going";
    let record = format!(
        "<wd:Worker {WD}><wd:Data>\
           <wd:{long}><wd:{long}><wd:Leaf>x</wd:Leaf></wd:{long}></wd:{long}>\
         </wd:Data></wd:Worker>"
    );
    let extracted = extract_rows(
        &[response(&record)],
        "Worker",
        &["~Data"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    let key = &extracted.columns[0];
    let full = format!("{long}_{long}_Leaf");
    assert!(full.len() > 63);
    assert!(key.len() <= 63);
    assert!(full.ends_with(key.as_str()));
    assert_eq!(extracted.rows[0].text(key), Some("x"));
}

#[test]
fn malformed_tags_are_skipped() {
    let extracted = extract_rows(
        &[response(&journal("J-1", &["a"]))],
        "Journal_Entry_Data",
        &["Journal_Number", "Memo>>%broken%"],
        &ExtractOptions::default(),
    )
    .expect("extract");
    assert_eq!(extracted.skipped.len(), 1);
    assert_eq!(extracted.columns, vec!["Journal_Number"]);
}

#[test]
fn input_errors_are_fatal() {
    let empty: Vec<Vec<u8>> = Vec::new();
    let err = extract_rows(&empty, "Journal_Entry_Data", &["Memo"], &ExtractOptions::default())
        .expect_err("no documents");
    assert!(matches!(err, ExtractError::NoDocuments));
    assert_eq!(err.to_string(), "no responses returned from API");

    let err = extract_rows(
        &[b"<unclosed>".to_vec()],
        "Journal_Entry_Data",
        &["Memo"],
        &ExtractOptions::default(),
    )
    .expect_err("bad xml");
    assert!(matches!(err, ExtractError::Xml { index: 0, .. }));
}

#[test]
fn dataframe_has_final_columns() {
    let options = ExtractOptions::default().with_allow_collections(true);
    let frame = extract(
        &[response(&journal("J-1", &["a", "b"]))],
        "Journal_Entry_Data",
        &["Journal_Number", "Journal_Entry_Line_Data>>Memo"],
        &options,
    )
    .expect("extract");
    assert_eq!(frame.shape(), (1, 2));
    let names: Vec<String> = frame
        .get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    insta::assert_snapshot!(names.join(","), @"Journal_Number,Memo");

    let joined = extract_rows(
        &[response(&journal("J-1", &["a", "b"]))],
        "Journal_Entry_Data",
        &["Journal_Entry_Line_Data>>Memo"],
        &options,
    )
    .expect("extract")
    .to_frame(&ListMode::Joined("; ".into()))
    .expect("frame");
    let memo = joined.column("Memo").expect("memo").str().expect("string");
    assert_eq!(memo.get(0), Some("a; b"));
}

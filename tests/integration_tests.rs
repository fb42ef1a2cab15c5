use std::io::{Cursor, Write};

use studio_board::attendance::process_attendance_data;
use studio_board::normalize::{Difficulty, Normalizer};
use studio_board::output::BoardRecord;
use studio_board::schedule::extract_schedule_data;
use zip::write::SimpleFileOptions;

fn attendance_zip(csv: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
        writer
            .start_file(
                "reports/momence-teachers-payroll-report-aggregate-combined-2025-08.csv",
                SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(csv.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf
}

#[test]
fn test_full_pipeline() {
    let csv_text = include_str!("fixtures/sample_schedule.csv");
    let normalizer = Normalizer::default();

    let schedule = extract_schedule_data(csv_text, &normalizer).expect("schedule should parse");

    let days: Vec<_> = schedule.iter_days().map(|(day, _)| day).collect();
    assert_eq!(days, vec!["Monday", "Tuesday"]);
    assert_eq!(schedule.total_classes(), 6);

    let monday = schedule.classes_for("Monday").unwrap();
    assert_eq!(monday.len(), 3);
    assert_eq!(monday[0].class_name, "Studio Barre 57");
    assert_eq!(monday[0].trainer1, "Karan Bhatia");
    assert_eq!(monday[0].difficulty, Difficulty::Beginner);

    // Cover substitution on the 9:00 AM slot.
    assert_eq!(monday[1].class_name, "Studio HIIT");
    assert_eq!(monday[1].trainer1, "Anisha Shah");
    assert_eq!(
        monday[1].notes,
        "Cover (Anisha Shah) replaces Trainer 1 (Rohan Dahima)"
    );

    // Unmapped class with a trainer becomes a private session.
    assert_eq!(monday[2].class_name, "Private Class - (Atulan)");

    // The canceled 6:00 PM Monday slot is gone; Tuesday's survives.
    let tuesday = schedule.classes_for("Tuesday").unwrap();
    assert_eq!(tuesday.len(), 3);
    assert_eq!(tuesday[2].class_name, "Studio Barre 57 Express");
    assert_eq!(tuesday[2].time, "6:00 PM");
}

#[test]
fn test_schedule_and_attendance_join() {
    let csv_text = include_str!("fixtures/sample_schedule.csv");
    let normalizer = Normalizer::default();
    let schedule = extract_schedule_data(csv_text, &normalizer).unwrap();

    // Two Mondays of history for the 7:00 AM Barre 57 slot at Kemps Corner.
    let report = "\
Class name,Class date,Location,Checked in,Participants,Late cancellations,Non Paid Customers,Comps Checked In\n\
Barre57,\"25 Aug 2025, 7:00 AM\",Kwality House,10,12,1,0,0\n\
Barre 57,\"18 Aug 2025, 7:00 AM\",Kemps Corner,8,9,0,1,0\n";
    let attendance =
        process_attendance_data(&attendance_zip(report), &normalizer).expect("zip should parse");

    let monday = schedule.classes_for("Monday").unwrap();
    let barre = &monday[0];
    let stats = attendance
        .get(&barre.attendance_key())
        .expect("schedule-side and attendance-side keys must agree");

    assert_eq!(stats.total_classes, 2);
    assert_eq!(stats.checked_in_count, 18);
    assert_eq!(stats.avg_attendance, "9.00");

    // Slots without history simply miss, without error.
    assert!(attendance.get(&monday[2].attendance_key()).is_none());

    let record = BoardRecord::new(barre, Some(stats));
    assert_eq!(record.avg_attendance.as_deref(), Some("9.00"));

    let unjoined = BoardRecord::new(&monday[2], None);
    assert!(unjoined.avg_attendance.is_none());
}

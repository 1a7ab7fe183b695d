//! Deterministic reply used when no LLM is configured or the LLM fails.

/// Whether `text` contains any character from the Thai Unicode block.
pub fn is_thai(text: &str) -> bool {
    text.chars().any(|c| ('\u{0E00}'..='\u{0E7F}').contains(&c))
}

/// Acknowledge `content`, adding one sentence per topic it mentions.
///
/// Replies in Thai when the message contains Thai script.  Thai matching is
/// case-sensitive; English matching ignores case.
pub fn fallback_response(content: &str) -> String {
    let mut reply = String::new();

    if is_thai(content) {
        reply.push_str("ขอบคุณสำหรับข้อความของคุณ ฉันได้รับข้อมูลแล้ว");
        let has = |needles: &[&str]| needles.iter().any(|n| content.contains(n));

        if has(&["ประชุม", "meeting"]) {
            reply.push_str("\n\nเกี่ยวกับการประชุมที่คุณกล่าวถึง ระบบได้บันทึกข้อมูลไว้แล้ว");
        }
        if has(&["email"]) {
            reply.push_str("\n\nข้อมูลการส่ง email ได้ถูกส่งไปประมวลผลแล้ว");
        }
        if has(&["team", "โพส"]) {
            reply.push_str("\n\nข้อมูลการโพสใน Team ได้ถูกบันทึกไว้แล้ว");
        }
        if has(&["กำหนด", "schedule", "นัดหมาย"]) {
            reply.push_str("\n\nข้อมูลการกำหนดตารางงานได้ถูกบันทึกไว้แล้ว");
        }
    } else {
        reply.push_str("Thank you for your message. I have received your information.");
        let lower = content.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["meeting"]) {
            reply.push_str(
                "\n\nRegarding the meeting you mentioned, the information has been recorded.",
            );
        }
        if has(&["email"]) {
            reply.push_str("\n\nThe email information has been sent for processing.");
        }
        if has(&["team", "post"]) {
            reply.push_str("\n\nThe Team posting information has been recorded.");
        }
        if has(&["schedule", "appointment"]) {
            reply.push_str("\n\nThe scheduling information has been recorded.");
        }
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thai_detection() {
        assert!(is_thai("สวัสดี"));
        assert!(is_thai("hello ก"));
        assert!(!is_thai("hello"));
        assert!(!is_thai(""));
    }

    #[test]
    fn plain_english_acknowledgement() {
        assert_eq!(
            fallback_response("hello there"),
            "Thank you for your message. I have received your information."
        );
    }

    #[test]
    fn english_topics_ignore_case() {
        let reply = fallback_response("Set up a MEETING and Email the Team");
        assert!(reply.contains("Regarding the meeting"));
        assert!(reply.contains("The email information"));
        assert!(reply.contains("Team posting"));
        assert!(!reply.contains("scheduling"));
        assert_eq!(reply.matches("\n\n").count(), 3);
    }

    #[test]
    fn thai_topics() {
        let reply = fallback_response("สร้างประชุมและกำหนดนัดหมาย");
        assert!(reply.starts_with("ขอบคุณสำหรับข้อความของคุณ"));
        assert!(reply.contains("เกี่ยวกับการประชุม"));
        assert!(reply.contains("การกำหนดตารางงาน"));
        assert!(!reply.contains("email"));
    }

    #[test]
    fn thai_matching_is_case_sensitive() {
        let reply = fallback_response("ส่ง EMAIL ให้ทีม");
        assert!(!reply.contains("email"));
        let reply = fallback_response("ส่ง email ให้ทีม");
        assert!(reply.contains("ข้อมูลการส่ง email"));
    }
}

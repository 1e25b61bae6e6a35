//! Text encodings for the uplink.
//!
//! Telemetry and fault-event frames are small JSON envelopes around a
//! pipe-separated body.  The body always ends in `|` and is followed by
//! its 8-bit byte sum as two hex digits:
//!
//! ```text
//! {"idx":0,"zz":"<cpuid>|<t>|<rh>|<t2>|<fan>|<relay>|<led>|<err>|<set>|<left>|<state>|<off>|<SUM>"}
//! {"idx":1,"evt":"<cpuid>|<changed>|<current>|<SUM>"}
//! ```

use core::fmt::Write;

use crate::app::events::{TelemetryData, UploadRecord};
use crate::config::UploadIdentity;
use crate::error::{CommsError, FaultFlags};

/// Largest encoded frame.
pub const FRAME_CAP: usize = 256;

pub type Frame = heapless::String<FRAME_CAP>;
pub type FormBody = heapless::String<FRAME_CAP>;

/// Wrapping byte sum.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, u8::wrapping_add)
}

fn envelope(idx: u8, field: &str, body: &str) -> Result<Frame, CommsError> {
    let mut frame = Frame::new();
    write!(
        frame,
        r#"{{"idx":{idx},"{field}":"{body}{:02X}"}}"#,
        checksum(body)
    )
    .map_err(|_| CommsError::Malformed)?;
    Ok(frame)
}

/// Encode one telemetry snapshot.
pub fn telemetry_frame(cpuid: &str, t: &TelemetryData) -> Result<Frame, CommsError> {
    let mut body: heapless::String<FRAME_CAP> = heapless::String::new();
    write!(
        body,
        "{cpuid}|{:.1}|{:.0}|{:.1}|{}|{:02X}|{:02X}|{:02X}|{}|{}|{}|{}|",
        t.temperature_c,
        t.humidity_percent,
        t.secondary_temperature_c,
        t.fan_current_raw,
        t.relay_bits,
        t.led_bits,
        t.fault_flags.bits(),
        t.set_temperature_c,
        t.remaining_minutes,
        t.state,
        u8::from(t.soft_off),
    )
    .map_err(|_| CommsError::Malformed)?;
    envelope(0, "zz", &body)
}

/// Encode a fault-register change.
pub fn event_frame(
    cpuid: &str,
    changed: FaultFlags,
    current: FaultFlags,
) -> Result<Frame, CommsError> {
    let mut body: heapless::String<64> = heapless::String::new();
    write!(
        body,
        "{cpuid}|{:04X}|{:04X}|",
        u16::from(changed.bits()),
        u16::from(current.bits())
    )
    .map_err(|_| CommsError::Malformed)?;
    envelope(1, "evt", &body)
}

/// URL-form body for one upload record.
pub fn form_body(id: &UploadIdentity, rec: &UploadRecord) -> Result<FormBody, CommsError> {
    let mut body = FormBody::new();
    write!(
        body,
        "product_id={}&partner_id={}&machine_id={}&record_id={}&measure_value={}&departure_yn={}",
        id.product_id,
        id.partner_id,
        id.machine_id,
        id.record_id,
        rec.measure_value,
        if rec.departure { 'Y' } else { 'N' },
    )
    .map_err(|_| CommsError::Malformed)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;

    const CPUID: &str = "FECAEFBEADDEFECAEFBEADDE";

    fn sample() -> TelemetryData {
        TelemetryData {
            state: "RUN",
            soft_off: false,
            temperature_c: 54.3,
            secondary_temperature_c: 23.0,
            humidity_percent: 41.6,
            fan_current_raw: 812,
            relay_bits: 0x06,
            led_bits: 0x23,
            fault_flags: FaultFlags::NONE,
            set_temperature_c: 55,
            remaining_minutes: 90,
        }
    }

    /// Split `"...|SUM"` off the quoted payload and check it.
    fn verify(frame: &str, field: &str) -> String {
        let start = frame.find(&format!("\"{field}\":\"")).unwrap() + field.len() + 4;
        let payload = &frame[start..frame.len() - 2];
        let (body, sum) = payload.split_at(payload.len() - 2);
        assert!(body.ends_with('|'));
        assert_eq!(u8::from_str_radix(sum, 16).unwrap(), checksum(body));
        body.to_string()
    }

    #[test]
    fn checksum_wraps() {
        assert_eq!(checksum(""), 0);
        assert_eq!(checksum("A"), 0x41);
        assert_eq!(checksum(&"\u{7f}".repeat(3)), 0x7D);
    }

    #[test]
    fn telemetry_layout() {
        let f = telemetry_frame(CPUID, &sample()).unwrap();
        assert!(f.starts_with(r#"{"idx":0,"zz":""#));
        assert!(f.ends_with("\"}"));
        let body = verify(&f, "zz");
        assert_eq!(
            body,
            format!("{CPUID}|54.3|42|23.0|812|06|23|00|55|90|RUN|0|")
        );
    }

    #[test]
    fn telemetry_carries_faults_and_soft_off() {
        let mut t = sample();
        t.fault_flags.set(Fault::Fan);
        t.soft_off = true;
        t.state = "FINISH";
        let body = verify(&telemetry_frame(CPUID, &t).unwrap(), "zz");
        let fields: Vec<&str> = body.split('|').collect();
        assert_eq!(fields[7], format!("{:02X}", Fault::Fan.mask()));
        assert_eq!(fields[10], "FINISH");
        assert_eq!(fields[11], "1");
    }

    #[test]
    fn event_layout() {
        let mut cur = FaultFlags::NONE;
        cur.set(Fault::ThermistorOpen);
        let f = event_frame(CPUID, cur, cur).unwrap();
        assert!(f.starts_with(r#"{"idx":1,"evt":""#));
        let body = verify(&f, "evt");
        let m = u16::from(Fault::ThermistorOpen.mask());
        assert_eq!(body, format!("{CPUID}|{m:04X}|{m:04X}|"));
    }

    #[test]
    fn oversized_identity_is_rejected() {
        let long = "X".repeat(FRAME_CAP);
        assert_eq!(
            telemetry_frame(&long, &sample()),
            Err(CommsError::Malformed)
        );
    }

    #[test]
    fn form_body_fields() {
        let mut id = UploadIdentity::default();
        id.product_id.push_str("P1").unwrap();
        id.partner_id.push_str("ACME").unwrap();
        id.machine_id.push_str("M7").unwrap();
        id.record_id.push_str("R42").unwrap();
        let rec = UploadRecord {
            measure_value: -3,
            departure: true,
        };
        assert_eq!(
            form_body(&id, &rec).unwrap().as_str(),
            "product_id=P1&partner_id=ACME&machine_id=M7&record_id=R42&measure_value=-3&departure_yn=Y"
        );
        let running = UploadRecord {
            measure_value: 55,
            departure: false,
        };
        assert!(form_body(&id, &running).unwrap().ends_with("departure_yn=N"));
    }
}

//! One-call wrappers around common Palm OS traps.
//!
//! Each wrapper builds a single packet, performs one call and returns the
//! interesting result. Trap numbers come from a [`TrapTable`].

use std::io::{Read, Write};

use bytes::Bytes;
use emurpc_packet::{MemoryRead, MemoryWrite, PacketError, ParamType, Rpc2Packet, RpcParam};
use serde::Serialize;

use crate::error::Result;
use crate::session::Session;
use crate::traps::{names, TrapTable};

/// Length of the name buffer passed to the database traps.
pub const DB_NAME_LEN: u8 = 32;

/// Read `length` bytes of emulated memory.
pub fn mem_read_memory<R: Read, W: Write>(
    session: &mut Session<R, W>,
    address: u32,
    length: u16,
) -> Result<Bytes> {
    let mut pkt = MemoryRead::new(address, length);
    session.call(&mut pkt)?;
    Ok(pkt.into_memory().unwrap_or_default())
}

/// Write `data` into emulated memory.
pub fn mem_write_memory<R: Read, W: Write>(
    session: &mut Session<R, W>,
    address: u32,
    data: impl Into<Bytes>,
) -> Result<()> {
    let mut pkt = MemoryWrite::new(address, data)?;
    session.call(&mut pkt)
}

/// Allocate `size` bytes on the emulated heap; returns the pointer (A0).
pub fn mem_ptr_new<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
    size: u32,
) -> Result<u32> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::MEM_PTR_NEW)?);
    pkt.param("size", RpcParam::u32(size));
    session.call(&mut pkt)?;
    Ok(pkt.a0())
}

pub fn sys_ticks_per_second<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
) -> Result<u32> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::SYS_TICKS_PER_SECOND)?);
    session.call(&mut pkt)?;
    Ok(pkt.d0())
}

pub fn dm_num_databases<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
    card_no: u16,
) -> Result<u32> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::DM_NUM_DATABASES)?);
    pkt.param("cardNo", RpcParam::u16(card_no));
    session.call(&mut pkt)?;
    Ok(pkt.d0())
}

/// Local id of the database at `index` on `card_no`.
pub fn dm_get_database<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
    card_no: u16,
    index: u16,
) -> Result<u32> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::DM_GET_DATABASE)?);
    pkt.param("cardNo", RpcParam::u16(card_no))
        .param("index", RpcParam::u16(index).by_ref());
    session.call(&mut pkt)?;
    Ok(pkt.d0())
}

/// Local id of the database called `name`, or 0.
pub fn dm_find_database<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
    card_no: u16,
    name: &str,
) -> Result<u32> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::DM_FIND_DATABASE)?);
    pkt.param("cardNo", RpcParam::u16(card_no)).param(
        "name",
        RpcParam::typed(true, ParamType::FixedString(DB_NAME_LEN), name)?,
    );
    session.call(&mut pkt)?;
    Ok(pkt.d0())
}

/// Header fields of one database, as returned by `DmDatabaseInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    /// Trap result (D0); zero on success.
    pub result: u32,
    pub name: String,
    pub attributes: u16,
    pub version: u16,
    pub creation_date: u32,
    pub modification_date: u32,
    pub backup_date: u32,
    pub modification_number: u32,
    pub app_info_id: u32,
    pub sort_info_id: u32,
    pub db_type: u32,
    pub creator: u32,
}

pub fn dm_database_info<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
    card_no: u16,
    db_id: u32,
) -> Result<DatabaseInfo> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::DM_DATABASE_INFO)?);
    pkt.param("cardNo", RpcParam::u16(card_no))
        .param("dbId", RpcParam::u32(db_id))
        .param(
            "name",
            RpcParam::typed(true, ParamType::FixedString(DB_NAME_LEN), "")?,
        )
        .param("attributes", RpcParam::u16(0).by_ref())
        .param("version", RpcParam::u16(0).by_ref())
        .param("crDate", RpcParam::u32(0).by_ref())
        .param("modDate", RpcParam::u32(0).by_ref())
        .param("bckUpDate", RpcParam::u32(0).by_ref())
        .param("modNum", RpcParam::u32(0).by_ref())
        .param("appInfoID", RpcParam::u32(0).by_ref())
        .param("sortInfoID", RpcParam::u32(0).by_ref())
        .param("type", RpcParam::u32(0).by_ref())
        .param("creator", RpcParam::u32(0).by_ref());
    session.call(&mut pkt)?;

    let word = |name: &str| -> Result<u32> {
        let value = pkt.value(name)?;
        value.as_u32().ok_or_else(|| {
            PacketError::MalformedParameter(format!("{name}: expected an integer")).into()
        })
    };
    let name = pkt.value("name")?.to_string_lossy().unwrap_or_default();

    Ok(DatabaseInfo {
        result: pkt.d0(),
        name,
        attributes: word("attributes")? as u16,
        version: word("version")? as u16,
        creation_date: word("crDate")?,
        modification_date: word("modDate")?,
        backup_date: word("bckUpDate")?,
        modification_number: word("modNum")?,
        app_info_id: word("appInfoID")?,
        sort_info_id: word("sortInfoID")?,
        db_type: word("type")?,
        creator: word("creator")?,
    })
}

pub fn dm_get_last_error<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
) -> Result<u32> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::DM_GET_LAST_ERR)?);
    session.call(&mut pkt)?;
    Ok(pkt.d0())
}

/// Post a key event to the emulated event queue.
pub fn evt_enqueue_key<R: Read, W: Write>(
    session: &mut Session<R, W>,
    traps: &TrapTable,
    ascii: u16,
    keycode: u16,
    modifiers: u16,
) -> Result<u32> {
    let mut pkt = Rpc2Packet::new(traps.resolve(names::EVT_ENQUEUE_KEY)?);
    pkt.param("ascii", RpcParam::u16(ascii))
        .param("keycode", RpcParam::u16(keycode))
        .param("modifiers", RpcParam::u16(modifiers));
    session.call(&mut pkt)?;
    Ok(pkt.d0())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use emurpc_frame::{decode_frame, encode_frame, Frame, FrameReader, FrameWriter, Placeholder, Route};

    use super::*;
    use crate::config::SessionConfig;
    use crate::error::{ErrorKind, SessionError};

    type TestSession = Session<Cursor<Vec<u8>>, Vec<u8>>;

    fn session(reply_bodies: &[Vec<u8>]) -> TestSession {
        let route = Route {
            destination: 1,
            source: 14,
            packet_type: 0,
        };
        let mut wire = BytesMut::new();
        for (i, body) in reply_bodies.iter().enumerate() {
            let frame = Frame::new(route, i as u8 + 1, body.clone(), &Placeholder).unwrap();
            encode_frame(&frame, &mut wire).unwrap();
        }
        Session::from_parts(
            FrameReader::new(Cursor::new(wire.to_vec())),
            FrameWriter::new(Vec::new()),
            SessionConfig::default(),
        )
    }

    fn requests(session: TestSession) -> Vec<Frame> {
        let (_, writer) = session.into_parts();
        let mut wire = BytesMut::from(writer.into_inner().as_slice());
        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut wire, usize::MAX).unwrap() {
            frames.push(frame);
        }
        frames
    }

    fn rpc2_reply(d0: u32, a0: u32, params: &[&[u8]]) -> Vec<u8> {
        let mut body = BytesMut::new();
        body.put_slice(&[0xF0, 0x00, 0x00, 0x00]);
        body.put_u32(d0);
        body.put_u32(a0);
        body.put_u16(0);
        body.put_u16(0);
        body.put_u16(params.len() as u16);
        for p in params {
            body.put_slice(p);
        }
        body.to_vec()
    }

    fn traps() -> TrapTable {
        let mut table = TrapTable::new();
        table
            .insert(names::MEM_PTR_NEW, 0xA013)
            .insert(names::DM_FIND_DATABASE, 0xA045)
            .insert(names::DM_DATABASE_INFO, 0xA046)
            .insert(names::EVT_ENQUEUE_KEY, 0xA12D);
        table
    }

    #[test]
    fn mem_ptr_new_returns_a0() {
        let mut s = session(&[rpc2_reply(0, 0x0001_8000, &[&[0, 4, 0, 0, 0, 10]])]);
        assert_eq!(mem_ptr_new(&mut s, &traps(), 10).unwrap(), 0x0001_8000);

        let sent = requests(s);
        assert_eq!(sent[0].header.destination, 14);
        assert_eq!(&sent[0].body[..4], &[0x70, 0x00, 0xA0, 0x13]);
        assert_eq!(&sent[0].body[16..], &[0, 1, 0, 4, 0, 0, 0, 10]);
    }

    #[test]
    fn find_database_sends_padded_name() {
        let mut name_param = vec![1u8, 32];
        name_param.extend_from_slice(b"MemoDB");
        name_param.resize(34, 0);
        let reply = rpc2_reply(0x00AB_CDEF, 0, &[&name_param, &[0, 2, 0, 0]]);
        let mut s = session(&[reply]);

        assert_eq!(
            dm_find_database(&mut s, &traps(), 0, "MemoDB").unwrap(),
            0x00AB_CDEF
        );
        let sent = requests(s);
        assert_eq!(&sent[0].body[16..18], &[0, 2]);
        assert_eq!(&sent[0].body[18..20], &[1, 32]);
        assert_eq!(&sent[0].body[20..26], b"MemoDB");
    }

    #[test]
    fn database_info_collects_byref_results() {
        let mut params: Vec<Vec<u8>> = Vec::new();
        // Wire order is the reverse of declaration order.
        for v in [0x6170_706Cu32, 0x4441_5441, 0, 0, 7, 3, 2, 1] {
            let mut p = vec![1, 4];
            p.extend_from_slice(&v.to_be_bytes());
            params.push(p);
        }
        params.push(vec![1, 2, 0, 1]);
        params.push(vec![1, 2, 0, 0x18]);
        let mut name = vec![1u8, 32];
        name.extend_from_slice(b"MemoDB\0");
        name.resize(34, 0);
        params.push(name);
        params.push(vec![0, 4, 0, 0, 0, 9]);
        params.push(vec![0, 2, 0, 0]);
        let refs: Vec<&[u8]> = params.iter().map(Vec::as_slice).collect();

        let mut s = session(&[rpc2_reply(0, 0, &refs)]);
        let info = dm_database_info(&mut s, &traps(), 0, 9).unwrap();
        assert_eq!(info.name, "MemoDB");
        assert_eq!(info.attributes, 0x18);
        assert_eq!(info.version, 1);
        assert_eq!(info.creation_date, 1);
        assert_eq!(info.modification_date, 2);
        assert_eq!(info.backup_date, 3);
        assert_eq!(info.modification_number, 7);
        assert_eq!(info.db_type, 0x4441_5441);
        assert_eq!(info.creator, 0x6170_706C);
    }

    #[test]
    fn enqueue_key_sends_three_words() {
        let mut s = session(&[rpc2_reply(0, 0, &[&[0, 2, 0, 0], &[0, 2, 0, 0], &[0, 2, 0, b'H']])]);
        evt_enqueue_key(&mut s, &traps(), u16::from(b'H'), 0, 0).unwrap();
        let sent = requests(s);
        assert_eq!(
            &sent[0].body[16..],
            &[0, 3, 0, 2, 0, 0, 0, 2, 0, 0, 0, 2, 0, b'H']
        );
    }

    #[test]
    fn missing_trap_fails_before_sending() {
        let mut s = session(&[]);
        let err = sys_ticks_per_second(&mut s, &traps()).unwrap_err();
        assert!(matches!(err, SessionError::UnknownTrap(_)));
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(!s.is_poisoned());
        assert!(requests(s).is_empty());
    }

    #[test]
    fn memory_write_then_read() {
        let mut s = session(&[vec![0x82, 0x00], {
            let mut body = vec![0x81, 0x00];
            body.extend_from_slice(b"123456789\0");
            body
        }]);
        mem_write_memory(&mut s, 0x2000, &b"123456789\0"[..]).unwrap();
        let data = mem_read_memory(&mut s, 0x2000, 10).unwrap();
        assert_eq!(data.as_ref(), b"123456789\0");
        assert_eq!(s.transaction_id(), 3);
    }
}

use std::fmt::Write;

use serde::Serialize;

use super::inst::{Ospf, ShowCallback};
use super::neigh::{ospf_ls_request_count, ospf_ls_retransmit_count};

impl Ospf {
    fn show_add(&mut self, path: &str, cb: ShowCallback) {
        self.show_cb.insert(path.to_string(), cb);
    }

    pub fn show_build(&mut self) {
        self.show_add("/show/ip/ospf/database", show_ospf_database);
        self.show_add("/show/ip/ospf/neighbor", show_ospf_neighbor);
    }

    pub fn show(&self, path: &str, json: bool) -> Option<String> {
        self.show_cb.get(path).map(|cb| cb(self, json))
    }
}

#[derive(Serialize)]
struct LsdbJson {
    scope: String,
    lsas: Vec<LsaJson>,
}

#[derive(Serialize)]
struct LsaJson {
    ls_type: String,
    ls_id: String,
    adv_router: String,
    age: u16,
    seq_number: String,
    checksum: String,
    length: u16,
}

#[derive(Serialize)]
struct NeighborJson {
    router_id: String,
    address: String,
    interface: String,
    state: String,
    retransmit: usize,
    request: usize,
}

fn database(ospf: &Ospf) -> Vec<LsdbJson> {
    let now = ospf.now;
    let mut dbs = vec![];
    for scope in ospf.scopes() {
        let Ok(lsdb) = ospf.lsdb(scope) else {
            continue;
        };
        if lsdb.is_empty() {
            continue;
        }
        let lsas = lsdb
            .values()
            .map(|lsa| LsaJson {
                ls_type: lsa.h.ls_type.to_string(),
                ls_id: lsa.h.ls_id.to_string(),
                adv_router: lsa.h.adv_router.to_string(),
                age: lsa.age(now),
                seq_number: format!("{:#010x}", lsa.h.ls_seq_number),
                checksum: format!("{:#06x}", lsa.h.ls_checksum),
                length: lsa.h.length,
            })
            .collect();
        dbs.push(LsdbJson {
            scope: scope.to_string(),
            lsas,
        });
    }
    dbs
}

fn scope_title(ospf: &Ospf, scope: &str) -> String {
    format!("OSPF Router with ID ({}) {}", ospf.router_id, scope)
}

pub fn show_ospf_database(ospf: &Ospf, json: bool) -> String {
    let dbs = database(ospf);
    if json {
        return serde_json::to_string_pretty(&dbs).unwrap_or_else(|_| "[]".to_string());
    }
    let mut buf = String::new();
    for db in dbs.iter() {
        writeln!(buf, "\n{}\n", scope_title(ospf, &db.scope)).unwrap();
        writeln!(
            buf,
            "{:<18} {:<15} {:<15} {:>4} {:<10} {:<6}",
            "Type", "Link ID", "ADV Router", "Age", "Seq#", "CkSum"
        )
        .unwrap();
        for lsa in db.lsas.iter() {
            writeln!(
                buf,
                "{:<18} {:<15} {:<15} {:>4} {:<10} {:<6}",
                lsa.ls_type, lsa.ls_id, lsa.adv_router, lsa.age, lsa.seq_number, lsa.checksum
            )
            .unwrap();
        }
    }
    buf
}

pub fn show_ospf_neighbor(ospf: &Ospf, json: bool) -> String {
    let mut nbrs = vec![];
    for link in ospf.links.values() {
        for nbr in link.nbrs.values() {
            nbrs.push(NeighborJson {
                router_id: nbr.router_id.to_string(),
                address: nbr.id.addr.to_string(),
                interface: link.name.clone(),
                state: nbr.state.to_string(),
                retransmit: ospf_ls_retransmit_count(nbr),
                request: ospf_ls_request_count(nbr),
            });
        }
    }
    if json {
        return serde_json::to_string_pretty(&nbrs).unwrap_or_else(|_| "[]".to_string());
    }
    let mut buf = String::new();
    writeln!(
        buf,
        "{:<15} {:<9} {:<15} {:<10} {:>5} {:>5}",
        "Neighbor ID", "State", "Address", "Interface", "RXmtL", "RqstL"
    )
    .unwrap();
    for nbr in nbrs.iter() {
        writeln!(
            buf,
            "{:<15} {:<9} {:<15} {:<10} {:>5} {:>5}",
            nbr.router_id, nbr.state, nbr.address, nbr.interface, nbr.retransmit, nbr.request
        )
        .unwrap();
    }
    buf
}
